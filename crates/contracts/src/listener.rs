//! SyncListener - the engine's notification boundary.

use crate::{Accuracy, Measurement, SensorKind, SyncedMeasurement};

/// Receives synchronizer notifications.
///
/// Every method defaults to a no-op so a listener implements only the events
/// it cares about. Callbacks fire synchronously on the engine's calling
/// thread, at most once per triggering event, and must not block or re-enter
/// the engine's `start`/`stop`.
pub trait SyncListener: Send {
    /// One aligned composite per alignment event. The value is a snapshot;
    /// retaining it is safe.
    fn on_synced_measurement(&mut self, synced: SyncedMeasurement) {
        let _ = synced;
    }

    /// A stream's reported accuracy changed.
    fn on_accuracy_changed(&mut self, kind: SensorKind, accuracy: Accuracy) {
        let _ = (kind, accuracy);
    }

    /// A capacity-bounded stream overflowed and dropped its oldest entry.
    fn on_buffer_filled(&mut self, kind: SensorKind) {
        let _ = kind;
    }

    /// Entries older than the stale threshold were evicted, one call per
    /// kind per maintenance pass.
    fn on_stale_measurements(&mut self, kind: SensorKind, evicted: Vec<Measurement>) {
        let _ = (kind, evicted);
    }
}

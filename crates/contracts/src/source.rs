//! SensorSource trait - sensor stream abstraction.
//!
//! One implementation per physical stream. Synthetic, replay, and any future
//! hardware-backed source share this surface, so the synchronizer never knows
//! which one it is driving.

use std::sync::Arc;

use crate::{Accuracy, ContractError, Measurement, SensorKind};

/// Event a source pushes into the delivery feed.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A new sample. `position` is the source's buffer cursor just past this
    /// sample; pull-based alignment uses it as the batch bound, window
    /// alignment ignores it.
    Sample {
        kind: SensorKind,
        measurement: Measurement,
        position: u64,
    },

    /// The stream's reported accuracy changed.
    AccuracyChanged { kind: SensorKind, accuracy: Accuracy },
}

impl SourceEvent {
    /// Stream the event belongs to.
    pub fn kind(&self) -> SensorKind {
        match self {
            SourceEvent::Sample { kind, .. } => *kind,
            SourceEvent::AccuracyChanged { kind, .. } => *kind,
        }
    }
}

/// Source event callback.
///
/// `Arc` so the same callback can be connected to every source of a rig.
pub type SourceCallback = Arc<dyn Fn(SourceEvent) + Send + Sync>;

/// A single sensor stream.
///
/// Lifecycle: `connect` the callback, then `start`; `stop` is idempotent and
/// safe on a source that never started. A source keeps an internal bounded
/// queue of produced samples so the pull accessors work alongside push
/// notifications.
pub trait SensorSource: Send {
    /// Stream category served by this source.
    fn kind(&self) -> SensorKind;

    /// Whether the underlying stream can deliver at all.
    fn is_available(&self) -> bool;

    /// Inject the event callback. Must happen before `start`; reconnecting
    /// replaces the previous callback.
    fn connect(&mut self, callback: SourceCallback);

    /// Begin delivery. Samples earlier than `start_timestamp` (monotonic
    /// nanoseconds) are discarded. Starting an already-running source is a
    /// no-op success.
    fn start(&mut self, start_timestamp: i64) -> Result<(), ContractError>;

    /// Stop delivery and drop queued samples.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Remove and return queued samples with cursor strictly before
    /// `position`, oldest first. Push-only sources keep the empty default.
    fn samples_before_position(&mut self, position: u64) -> Vec<Measurement> {
        let _ = position;
        Vec::new()
    }

    /// Remove and return queued samples with timestamp strictly before
    /// `timestamp`, oldest first. Push-only sources keep the empty default.
    fn samples_before_timestamp(&mut self, timestamp: i64) -> Vec<Measurement> {
        let _ = timestamp;
        Vec::new()
    }
}

impl std::fmt::Debug for dyn SensorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSource")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

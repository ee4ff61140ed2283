//! MeasurementSink trait - dispatcher output interface.

use crate::{ContractError, SyncedMeasurement};

/// Destination for synchronized output.
///
/// All sink implementations must implement this trait.
#[trait_variant::make(MeasurementSink: Send)]
pub trait LocalMeasurementSink {
    /// Sink name (used for logging/metrics).
    fn name(&self) -> &str;

    /// Write one synchronized measurement.
    ///
    /// # Errors
    /// Returns write error (should include context).
    async fn write(&mut self, synced: &SyncedMeasurement) -> Result<(), ContractError>;

    /// Flush buffered output (if any).
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close the sink.
    async fn close(&mut self) -> Result<(), ContractError>;
}

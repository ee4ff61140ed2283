//! LogSink - logs measurement summary via tracing

use contracts::{ContractError, MeasurementSink, SyncedMeasurement};
use tracing::{info, instrument};

/// Sink that logs measurement summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_summary(&self, synced: &SyncedMeasurement) {
        let kinds: Vec<&str> = synced.present_kinds().map(|kind| kind.as_str()).collect();

        info!(
            sink = %self.name,
            timestamp = synced.timestamp,
            slots = kinds.len(),
            kinds = ?kinds,
            "Synced measurement received"
        );
    }
}

impl MeasurementSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, synced),
        fields(sink = %self.name, timestamp = synced.timestamp)
    )]
    async fn write(&mut self, synced: &SyncedMeasurement) -> Result<(), ContractError> {
        self.log_summary(synced);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Accuracy, Measurement, SensorKind};

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let mut synced = SyncedMeasurement {
            timestamp: 1_000,
            ..Default::default()
        };
        synced.set(
            SensorKind::Accelerometer,
            Measurement::vector(0.1, 0.2, 9.8, 1_000, Accuracy::High),
        );

        let result = sink.write(&synced).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}

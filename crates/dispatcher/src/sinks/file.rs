//! FileSink - appends measurements to a JSONL session file

use contracts::{ContractError, MeasurementSink, SyncedMeasurement};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Sink that writes one JSON line per measurement
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
    line_count: u64,
}

impl FileSink {
    /// Create a new FileSink
    ///
    /// Opens `<base_path>/session-<stamp>/<name>.jsonl` for writing.
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let session_dir = config.base_path.join(format!("session-{}", stamp));
        fs::create_dir_all(&session_dir)?;

        let path = session_dir.join(format!("{}.jsonl", name));
        let writer = BufWriter::new(File::create(&path)?);

        debug!(sink = %name, path = %path.display(), "FileSink opened");

        Ok(Self {
            name,
            path,
            writer,
            line_count: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&mut self, synced: &SyncedMeasurement) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, synced)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        self.line_count += 1;
        Ok(())
    }

    fn persist(&mut self, synced: &SyncedMeasurement) -> Result<(), ContractError> {
        self.append_line(synced).map_err(|e| {
            error!(sink = %self.name, timestamp = synced.timestamp, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl MeasurementSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, synced),
        fields(sink = %self.name, timestamp = synced.timestamp)
    )]
    async fn write(&mut self, synced: &SyncedMeasurement) -> Result<(), ContractError> {
        self.persist(synced)?;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(
            sink = %self.name,
            lines = self.line_count,
            path = %self.path.display(),
            "FileSink closed"
        );
        Ok(())
    }
}

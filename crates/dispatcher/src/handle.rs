//! SinkHandle - manages a sink with isolated queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{MeasurementSink, SyncedMeasurement};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to send measurements to worker
    tx: mpsc::Sender<SyncedMeasurement>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: MeasurementSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Send a measurement to the sink (non-blocking)
    ///
    /// Returns true if sent, false if queue full (measurement dropped)
    pub fn try_send(&self, synced: SyncedMeasurement) -> bool {
        match self.tx.try_send(synced) {
            Ok(()) => {
                // Update queue length approximation
                self.metrics.set_queue_len(self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(s)) => {
                self.metrics.inc_dropped_count();
                warn!(
                    sink = %self.name,
                    timestamp = s.timestamp,
                    "Queue full, measurement dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the sink worker gracefully
    #[instrument(name = "sink_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        // Wait for worker to finish
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes measurements and writes to sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: MeasurementSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<SyncedMeasurement>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(synced) = rx.recv().await {
        // Update queue length
        metrics.set_queue_len(rx.len());

        match sink.write(&synced).await {
            Ok(()) => {
                metrics.inc_write_count();
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    sink = %name,
                    timestamp = synced.timestamp,
                    error = %e,
                    "Write failed"
                );
                // Continue processing - don't crash on single failure
            }
        }
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

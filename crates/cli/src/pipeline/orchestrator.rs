//! Pipeline orchestrator - coordinates all components.
//!
//! Builds sensor sources from the blueprint, bridges the synchronizer's
//! listener callbacks into the dispatcher channel, and drives the engine
//! loop until a stop condition is reached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    Measurement, RigBlueprint, SensorKind, SourceEvent, SyncListener, SyncedMeasurement,
};
use observability::{record_emission_metrics, record_sample_received, SyncAggregator};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The rig blueprint configuration
    pub blueprint: RigBlueprint,

    /// Maximum number of synced measurements to produce (None = unlimited)
    pub max_synced: Option<u64>,

    /// Run duration (None = run until Ctrl-C or the feed closes)
    pub duration: Option<Duration>,

    /// Channel buffer size between the engine and the dispatcher
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Forwards synchronizer notifications into the dispatcher channel.
///
/// Runs inside the engine's synchronous callbacks on the engine loop task,
/// so it must not block: a full dispatcher queue drops the emission.
struct EmissionBridge {
    tx: mpsc::Sender<SyncedMeasurement>,
    expected: Vec<SensorKind>,
    aggregator: Arc<Mutex<SyncAggregator>>,
    emitted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl SyncListener for EmissionBridge {
    fn on_synced_measurement(&mut self, synced: SyncedMeasurement) {
        record_emission_metrics(&synced, &self.expected);
        self.aggregator.lock().unwrap().update(&synced);
        self.emitted.fetch_add(1, Ordering::Relaxed);

        info!(
            timestamp = synced.timestamp,
            slots = synced.slot_count(),
            "Synced measurement produced"
        );

        match self.tx.try_send(synced) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    timestamp = synced.timestamp,
                    "Dispatcher queue full, synced measurement dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Dispatcher channel closed");
            }
        }
    }

    fn on_stale_measurements(&mut self, kind: SensorKind, evicted: Vec<Measurement>) {
        warn!(kind = %kind, evicted = evicted.len(), "Stale samples evicted");
    }

    fn on_buffer_filled(&mut self, kind: SensorKind) {
        warn!(kind = %kind, "Stream buffer overflowed");
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Build sensor sources
        info!("Building sensor sources from blueprint...");
        let mut sensor_sources =
            sources::build_sources(blueprint).context("Failed to build sensor sources")?;
        let active_sources = sensor_sources.len();

        // Delivery feed
        let mut feed = sources::SampleFeed::with_settings(&blueprint.feed);
        let callback = feed.callback();
        for source in &mut sensor_sources {
            source.connect(callback.clone());
        }
        let feed_rx = feed
            .take_receiver()
            .context("Failed to get feed receiver")?;
        let feed_metrics = feed.metrics();

        info!(active_sources, "Sensor sources configured");

        // Setup Sync Engine
        info!("Configuring sync engine...");
        let sync_config = blueprint.to_sync_config();
        let mut engine = sync_engine::Synchronizer::new(sync_config)
            .context("Failed to configure sync engine")?;
        for source in sensor_sources {
            engine.attach_source(source);
        }

        info!(
            reference = %blueprint.sync.reference,
            mode = ?blueprint.sync.mode,
            "Sync engine configured"
        );

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let (sync_tx, sync_rx) = mpsc::channel::<SyncedMeasurement>(self.config.buffer_size);

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - synced measurements will be dropped");
        }

        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), sync_rx)
            .await
            .context("Failed to create dispatcher")?;

        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        // Bridge engine notifications into the dispatcher channel
        let expected: Vec<SensorKind> = blueprint.sensors.iter().map(|s| s.kind).collect();
        let aggregator = Arc::new(Mutex::new(SyncAggregator::with_expected(expected.clone())));
        let emitted = Arc::new(AtomicU64::new(0));
        let dropped = Arc::new(AtomicU64::new(0));

        engine.set_listener(Box::new(EmissionBridge {
            tx: sync_tx,
            expected,
            aggregator: aggregator.clone(),
            emitted: emitted.clone(),
            dropped: dropped.clone(),
        }));

        // Start Pipeline
        engine.start(None).context("Failed to start synchronizer")?;

        let max_synced = self.config.max_synced;
        let deadline = self
            .config
            .duration
            .map(|d| tokio::time::Instant::now() + d);

        info!(max_synced = ?max_synced, "Pipeline running");

        // Engine loop: drain the feed into the synchronizer
        let mut samples_received = 0u64;
        loop {
            let event = if let Some(deadline) = deadline {
                match tokio::time::timeout_at(deadline, feed_rx.recv()).await {
                    Ok(Ok(event)) => event,
                    Ok(Err(_)) => {
                        info!("Delivery feed closed");
                        break;
                    }
                    Err(_) => {
                        info!("Run duration reached");
                        break;
                    }
                }
            } else {
                match feed_rx.recv().await {
                    Ok(event) => event,
                    Err(_) => {
                        info!("Delivery feed closed");
                        break;
                    }
                }
            };

            match event {
                SourceEvent::Sample {
                    kind,
                    measurement,
                    position,
                } => {
                    samples_received += 1;
                    record_sample_received(kind, measurement.variant);
                    engine.on_sample(kind, measurement, position);
                }
                SourceEvent::AccuracyChanged { kind, accuracy } => {
                    engine.on_accuracy_changed(kind, accuracy);
                }
            }

            if !engine.is_running() {
                info!("Synchronizer halted, stopping pipeline");
                break;
            }

            if let Some(max) = max_synced {
                if emitted.load(Ordering::Relaxed) >= max {
                    info!(
                        synced = emitted.load(Ordering::Relaxed),
                        "Reached max synced limit"
                    );
                    break;
                }
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        // Close the feed first: a producer parked on a full channel under the
        // block policy only wakes once the channel closes, and stop() joins
        // the producer threads.
        feed_rx.close();
        let engine_stats = engine.stats();
        engine.stop();
        // Dropping the engine drops the bridge and closes the dispatcher input
        drop(engine);

        // Wait for dispatcher to flush
        let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

        let feed_snapshot = feed_metrics.snapshot();
        let sync_metrics = aggregator.lock().unwrap().clone();

        let stats = PipelineStats {
            samples_received,
            synced_emitted: emitted.load(Ordering::Relaxed),
            synced_dropped: dropped.load(Ordering::Relaxed),
            feed_dropped: feed_snapshot.events_dropped,
            engine: engine_stats,
            duration: start_time.elapsed(),
            active_sources,
            active_sinks,
            sync_metrics,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate_hz = format!("{:.2}", stats.rate_hz()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

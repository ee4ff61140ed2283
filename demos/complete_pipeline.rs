//! Complete Pipeline Demo
//!
//! Demonstrates loading a blueprint (or falling back to a built-in one),
//! wiring synthetic sensor streams into the synchronizer, and fanning out
//! synced measurements via the dispatcher.
//!
//! Run with: cargo run --bin complete_pipeline -- [config_path]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{
    RigBlueprint, RigConfig, SensorKind, SensorSpec, SinkConfig, SinkType, SourceEvent,
    SyncListener, SyncSettings, SyncedMeasurement,
};
use dispatcher::create_dispatcher;
use sources::SampleFeed;
use sync_engine::Synchronizer;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Forwards emissions into the dispatcher channel and counts them.
struct DemoBridge {
    tx: mpsc::Sender<SyncedMeasurement>,
    emitted: Arc<AtomicU64>,
}

impl SyncListener for DemoBridge {
    fn on_synced_measurement(&mut self, synced: SyncedMeasurement) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        info!(
            timestamp = synced.timestamp,
            slots = synced.slot_count(),
            "Synced measurement produced"
        );
        let _ = self.tx.try_send(synced);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Complete Pipeline Demo");

    let blueprint = if let Some(path) = std::env::args().nth(1) {
        info!(path = %path, "Loading blueprint config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        demo_blueprint()
    };
    info!(rig = %blueprint.rig.name, "Blueprint loaded");

    // ==== Stage 1: Sources + delivery feed ====
    let mut sensor_sources = sources::build_sources(&blueprint)?;
    let mut feed = SampleFeed::with_settings(&blueprint.feed);
    let callback = feed.callback();
    for source in &mut sensor_sources {
        source.connect(callback.clone());
    }
    let feed_rx = feed.take_receiver().expect("fresh feed has a receiver");
    info!(source_count = sensor_sources.len(), "Sensor streams wired");

    // ==== Stage 2: Sync engine ====
    let mut engine = Synchronizer::new(blueprint.to_sync_config())?;
    for source in sensor_sources {
        engine.attach_source(source);
    }

    // ==== Stage 3: Dispatcher with sinks from config ====
    let (sync_tx, sync_rx) = mpsc::channel::<SyncedMeasurement>(100);
    let dispatcher = create_dispatcher(blueprint.sinks.clone(), sync_rx).await?;
    let dispatcher_handle = dispatcher.spawn();

    let emitted = Arc::new(AtomicU64::new(0));
    engine.set_listener(Box::new(DemoBridge {
        tx: sync_tx,
        emitted: emitted.clone(),
    }));

    // ==== Stage 4: Run ====
    let target_synced = 20u64;
    engine.start(None)?;
    info!(target_synced, "Pipeline running");

    let emitted_in = emitted.clone();
    let run = tokio::time::timeout(Duration::from_secs(10), async move {
        while let Ok(event) = feed_rx.recv().await {
            match event {
                SourceEvent::Sample {
                    kind,
                    measurement,
                    position,
                } => engine.on_sample(kind, measurement, position),
                SourceEvent::AccuracyChanged { kind, accuracy } => {
                    engine.on_accuracy_changed(kind, accuracy)
                }
            }
            if emitted_in.load(Ordering::Relaxed) >= target_synced {
                break;
            }
        }
        engine
    })
    .await;

    // ==== Stage 5: Graceful shutdown ====
    info!("Shutting down...");
    match run {
        Ok(mut engine) => {
            let stats = engine.stats();
            engine.stop();
            drop(engine);
            info!(
                processed = stats.processed,
                synced = stats.emitted,
                "Engine stopped"
            );
        }
        Err(_) => info!("Run timed out before reaching the target"),
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;
    info!(
        total_synced = emitted.load(Ordering::Relaxed),
        "Pipeline complete"
    );

    Ok(())
}

/// Built-in three-stream rig used when no config path is given.
fn demo_blueprint() -> RigBlueprint {
    RigBlueprint {
        version: Default::default(),
        rig: RigConfig {
            name: "demo-rig".to_string(),
            description: Some("Synthetic three-stream demo".to_string()),
        },
        sensors: vec![
            sensor_spec(SensorKind::Accelerometer, 200.0),
            sensor_spec(SensorKind::Gyroscope, 100.0),
            sensor_spec(SensorKind::Magnetometer, 50.0),
        ],
        sync: SyncSettings {
            reference: SensorKind::Accelerometer,
            mode: Default::default(),
            window_ms: 100.0,
            capacity: 64,
            interpolation: true,
            interpolator: Default::default(),
            stale_detection: true,
            stale_threshold_ms: 500.0,
            stop_when_filled_buffer: false,
            skip_when_processing: false,
        },
        feed: Default::default(),
        sinks: vec![SinkConfig {
            name: "console".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 100,
            params: Default::default(),
        }],
        observability: Default::default(),
    }
}

fn sensor_spec(kind: SensorKind, rate_hz: f64) -> SensorSpec {
    SensorSpec {
        kind,
        variant: Default::default(),
        rate_hz,
        window_ms: None,
        capacity: None,
        interpolator: None,
        accuracy: contracts::Accuracy::High,
        source: Default::default(),
    }
}

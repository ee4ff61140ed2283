//! Window Sync Demo
//!
//! Minimal, runtime-free use of the synchronizer: two synthetic streams, a
//! std channel as the delivery feed, window-triggered alignment printed to
//! the log.
//!
//! Run with: cargo run --bin window_sync

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    AlignMode, BufferBound, InterpolationConfig, SensorKind, SensorSource, SourceEvent, SyncConfig,
    SyncListener, SyncedMeasurement,
};
use sources::{SyntheticConfig, SyntheticSource};
use sync_engine::Synchronizer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

struct PrintListener;

impl SyncListener for PrintListener {
    fn on_synced_measurement(&mut self, synced: SyncedMeasurement) {
        let kinds: Vec<&str> = synced.present_kinds().map(|k| k.as_str()).collect();
        info!(
            timestamp = synced.timestamp,
            kinds = ?kinds,
            "Synced measurement"
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Window Sync Demo");

    // Accelerometer arrivals trigger alignment; the gyroscope keeps a 50 ms
    // sliding history for the bracket lookup.
    let window_ns = 50_000_000;
    let config = SyncConfig {
        reference: SensorKind::Accelerometer,
        mode: AlignMode::Window,
        bounds: HashMap::from([
            (
                SensorKind::Accelerometer,
                BufferBound::Window { window_ns },
            ),
            (SensorKind::Gyroscope, BufferBound::Window { window_ns }),
        ]),
        interpolation: InterpolationConfig::default(),
        stale_threshold_ns: None,
        stop_when_filled_buffer: false,
        skip_when_processing: false,
    };

    let mut engine = Synchronizer::new(config)?;
    engine.set_listener(Box::new(PrintListener));

    // A std channel serializes both sensor threads onto this one.
    let (tx, rx) = mpsc::channel::<SourceEvent>();
    let callback: sources::SourceCallback = Arc::new(move |event| {
        let _ = tx.send(event);
    });

    for (kind, rate_hz) in [
        (SensorKind::Accelerometer, 100.0),
        (SensorKind::Gyroscope, 200.0),
    ] {
        let mut source = SyntheticSource::new(
            kind,
            SyntheticConfig {
                rate_hz,
                ..SyntheticConfig::default()
            },
        );
        source.connect(callback.clone());
        engine.attach_source(Box::new(source));
    }
    drop(callback);

    engine.start(None)?;

    let target_synced = 10u64;
    while engine.stats().emitted < target_synced {
        let event = match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(event) => event,
            Err(_) => break,
        };
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
    }

    let stats = engine.stats();
    engine.stop();
    info!(
        processed = stats.processed,
        emitted = stats.emitted,
        incomplete = stats.incomplete,
        "Demo complete"
    );

    Ok(())
}

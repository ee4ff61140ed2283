//! Synthetic sensor implementation
//!
//! Implements `SensorSource` trait, generates a deterministic waveform in a
//! background thread. Used for testing and development without physical
//! hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{
    clock, Accuracy, ContractError, Measurement, Quaternion, SampleValues, SensorKind,
    SensorSource, SensorVariant, SourceCallback, SourceEvent, Vector3,
};
use tracing::{debug, trace};

use crate::queue::SampleQueue;

/// Synthetic source configuration
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Sample frequency (Hz)
    pub rate_hz: f64,
    /// Peak waveform amplitude
    pub amplitude: f64,
    /// Deterministic jitter magnitude added per component
    pub noise: f64,
    /// Accuracy reported with every sample
    pub accuracy: Accuracy,
    /// Hardware subtype reported with every sample
    pub variant: SensorVariant,
    /// Bound of the internal queue backing the pull accessors
    pub queue_capacity: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            rate_hz: 100.0,
            amplitude: 1.0,
            noise: 0.0,
            accuracy: Accuracy::High,
            variant: SensorVariant::Calibrated,
            queue_capacity: 1024,
        }
    }
}

/// Synthetic sensor
///
/// Generates waveform samples at the configured frequency in a background
/// thread. Samples are pushed through the connected callback and mirrored
/// into the pull queue, consistent with hardware-backed source behavior.
pub struct SyntheticSource {
    kind: SensorKind,
    config: SyntheticConfig,
    callback: Option<SourceCallback>,
    running: Arc<AtomicBool>,
    queue: Arc<Mutex<SampleQueue>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SyntheticSource {
    /// Create a new synthetic source
    pub fn new(kind: SensorKind, config: SyntheticConfig) -> Self {
        let queue_capacity = config.queue_capacity.max(1);
        Self {
            kind,
            config,
            callback: None,
            running: Arc::new(AtomicBool::new(false)),
            queue: Arc::new(Mutex::new(SampleQueue::new(queue_capacity))),
            thread_handle: None,
        }
    }

    /// Create a synthetic source with default configuration
    pub fn with_defaults(kind: SensorKind) -> Self {
        Self::new(kind, SyntheticConfig::default())
    }

    /// Generate the waveform sample `elapsed_sec` into the run
    fn generate_values(
        kind: SensorKind,
        config: &SyntheticConfig,
        elapsed_sec: f64,
        position: u64,
    ) -> SampleValues {
        let phase = std::f64::consts::TAU * 0.5 * elapsed_sec;
        let a = config.amplitude;
        let n = |lane: u64| jitter(position.wrapping_mul(5).wrapping_add(lane)) * config.noise;

        match kind {
            SensorKind::Accelerometer => SampleValues::Vector(Vector3::new(
                a * phase.sin() + n(0),
                a * phase.cos() + n(1),
                9.81 + n(2),
            )),
            SensorKind::Gyroscope => SampleValues::Vector(Vector3::new(
                a * phase.cos() + n(0),
                a * phase.sin() + n(1),
                n(2),
            )),
            SensorKind::Gravity => {
                SampleValues::Vector(Vector3::new(n(0), n(1), 9.81 + n(2)))
            }
            SensorKind::Magnetometer => SampleValues::Vector(Vector3::new(
                22.0 + a * phase.sin() + n(0),
                5.0 + n(1),
                -42.0 + n(2),
            )),
            SensorKind::Attitude => {
                // small yaw oscillation around identity
                let half_yaw = 0.05 * a * phase.sin();
                SampleValues::Rotation(Quaternion::new(half_yaw.cos(), 0.0, 0.0, half_yaw.sin()))
            }
        }
    }
}

/// Deterministic jitter in [-1, 1], keyed by sample position
fn jitter(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 33;
    ((x >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
}

impl SensorSource for SyntheticSource {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        true
    }

    fn connect(&mut self, callback: SourceCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self, start_timestamp: i64) -> Result<(), ContractError> {
        // Idempotent: if already running, don't start again
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let kind = self.kind;
        let config = self.config.clone();
        let callback = self.callback.clone();
        let running = self.running.clone();
        let queue = self.queue.clone();

        let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(0.1));

        let handle = thread::spawn(move || {
            debug!(
                kind = %kind,
                rate_hz = config.rate_hz,
                "synthetic source started"
            );

            if let Some(callback) = &callback {
                callback(SourceEvent::AccuracyChanged {
                    kind,
                    accuracy: config.accuracy,
                });
            }

            let mut position: u64 = 0;

            while running.load(Ordering::Relaxed) {
                let timestamp = clock::now_ns();
                if timestamp < start_timestamp {
                    thread::sleep(interval);
                    continue;
                }

                let values =
                    Self::generate_values(kind, &config, timestamp as f64 / 1e9, position);
                let measurement = Measurement {
                    values,
                    timestamp,
                    accuracy: config.accuracy,
                    variant: config.variant,
                };

                queue.lock().unwrap().push(position, measurement);
                position += 1;

                if let Some(callback) = &callback {
                    callback(SourceEvent::Sample {
                        kind,
                        measurement,
                        position,
                    });
                }

                trace!(kind = %kind, position, timestamp, "synthetic sample sent");

                thread::sleep(interval);
            }

            debug!(kind = %kind, "synthetic source stopped");
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        self.queue.lock().unwrap().clear();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn samples_before_position(&mut self, position: u64) -> Vec<Measurement> {
        self.queue.lock().unwrap().take_before_position(position)
    }

    fn samples_before_timestamp(&mut self, timestamp: i64) -> Vec<Measurement> {
        self.queue.lock().unwrap().take_before_timestamp(timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn synthetic_source_delivers_samples() {
        let mut source = SyntheticSource::new(
            SensorKind::Accelerometer,
            SyntheticConfig {
                rate_hz: 200.0,
                ..Default::default()
            },
        );

        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();

        source.connect(Arc::new(move |event| {
            if let SourceEvent::Sample {
                kind, measurement, ..
            } = event
            {
                assert_eq!(kind, SensorKind::Accelerometer);
                assert!(measurement.timestamp >= 0);
                count_clone.fetch_add(1, Ordering::Relaxed);
            }
        }));

        source.start(0).unwrap();
        thread::sleep(Duration::from_millis(100));
        source.stop();

        assert!(count.load(Ordering::Relaxed) > 0);
        assert!(!source.is_running());
    }

    #[test]
    fn start_is_idempotent() {
        let mut source = SyntheticSource::with_defaults(SensorKind::Gyroscope);

        source.start(0).unwrap();
        source.start(0).unwrap();
        assert!(source.is_running());

        source.stop();
        assert!(!source.is_running());
    }

    #[test]
    fn announces_initial_accuracy() {
        let mut source = SyntheticSource::new(
            SensorKind::Magnetometer,
            SyntheticConfig {
                rate_hz: 200.0,
                accuracy: Accuracy::Medium,
                ..Default::default()
            },
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        source.connect(Arc::new(move |event| {
            events_clone.lock().unwrap().push(event);
        }));

        source.start(0).unwrap();
        thread::sleep(Duration::from_millis(50));
        source.stop();

        let events = events.lock().unwrap();
        assert!(matches!(
            events.first(),
            Some(SourceEvent::AccuracyChanged {
                kind: SensorKind::Magnetometer,
                accuracy: Accuracy::Medium,
            })
        ));
    }

    #[test]
    fn pull_accessors_drain_the_queue() {
        let mut source = SyntheticSource::new(
            SensorKind::Accelerometer,
            SyntheticConfig {
                rate_hz: 500.0,
                ..Default::default()
            },
        );

        source.start(0).unwrap();
        thread::sleep(Duration::from_millis(100));

        let drained = source.samples_before_timestamp(i64::MAX);
        assert!(!drained.is_empty());
        for pair in drained.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }

        source.stop();
        assert!(source.samples_before_timestamp(i64::MAX).is_empty());
    }

    #[test]
    fn attitude_produces_unit_rotations() {
        let config = SyntheticConfig::default();
        let values =
            SyntheticSource::generate_values(SensorKind::Attitude, &config, 0.37, 5);

        match values {
            SampleValues::Rotation(q) => {
                let norm = (q.w * q.w + q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
                assert!((norm - 1.0).abs() < 1e-9);
            }
            _ => panic!("expected rotation values"),
        }
    }
}

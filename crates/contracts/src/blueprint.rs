//! RigBlueprint - Config Loader output
//!
//! Describes a complete run: the rig, its sensor streams, sync strategy,
//! feed backpressure, and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{
    Accuracy, AlignMode, BufferBound, InterpolationConfig, InterpolatorChoice, SensorKind,
    SensorVariant, SyncConfig,
};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete rig configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Rig identity
    pub rig: RigConfig,

    /// Sensor stream definitions
    pub sensors: Vec<SensorSpec>,

    /// Synchronization strategy
    pub sync: SyncSettings,

    /// Delivery feed tuning
    #[serde(default)]
    pub feed: FeedSettings,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Logging/metrics defaults (CLI flags override)
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// Rig identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// Human-readable rig name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// One sensor stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSpec {
    /// Stream category
    pub kind: SensorKind,

    /// Hardware subtype
    #[serde(default)]
    pub variant: SensorVariant,

    /// Sampling-rate hint (Hz), must be > 0
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Per-kind window override in milliseconds (window mode)
    #[serde(default)]
    pub window_ms: Option<f64>,

    /// Per-kind capacity override (pull mode)
    #[serde(default)]
    pub capacity: Option<usize>,

    /// Per-kind interpolator override
    #[serde(default)]
    pub interpolator: Option<InterpolatorChoice>,

    /// Initial reported accuracy
    #[serde(default = "default_initial_accuracy")]
    pub accuracy: Accuracy,

    /// Backend that produces the stream
    #[serde(default)]
    pub source: SourceBackend,
}

fn default_rate_hz() -> f64 {
    100.0
}

fn default_initial_accuracy() -> Accuracy {
    Accuracy::High
}

/// Stream backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum SourceBackend {
    /// Deterministic waveform generator
    Synthetic {
        /// Peak amplitude of the generated waveform
        #[serde(default = "default_amplitude")]
        amplitude: f64,

        /// Uniform noise added on top of the waveform
        #[serde(default)]
        noise: f64,
    },

    /// Recorded JSONL measurement log
    Replay {
        /// Path to the recording
        path: PathBuf,

        /// Respect recorded inter-sample gaps instead of replaying
        /// as fast as possible
        #[serde(default)]
        paced: bool,
    },
}

fn default_amplitude() -> f64 {
    1.0
}

impl Default for SourceBackend {
    fn default() -> Self {
        SourceBackend::Synthetic {
            amplitude: default_amplitude(),
            noise: 0.0,
        }
    }
}

/// Synchronization strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Reference kind (its arrivals trigger alignment)
    pub reference: SensorKind,

    /// Alignment discipline
    #[serde(default)]
    pub mode: AlignMode,

    /// Default sliding window in milliseconds (window mode)
    #[serde(default = "default_window_ms")]
    pub window_ms: f64,

    /// Default per-stream capacity (pull mode)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Resample companions to the reference timestamp
    #[serde(default = "default_true")]
    pub interpolation: bool,

    /// Default interpolator for vector streams
    #[serde(default)]
    pub interpolator: InterpolatorChoice,

    /// Enable stale-sample eviction
    #[serde(default)]
    pub stale_detection: bool,

    /// Stale eviction threshold in milliseconds
    #[serde(default = "default_stale_threshold_ms")]
    pub stale_threshold_ms: f64,

    /// Stop the engine when any capacity stream overflows
    #[serde(default)]
    pub stop_when_filled_buffer: bool,

    /// Drop deliveries arriving while an alignment pass is in progress
    #[serde(default)]
    pub skip_when_processing: bool,
}

fn default_window_ms() -> f64 {
    100.0
}

fn default_capacity() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_stale_threshold_ms() -> f64 {
    500.0
}

/// Delivery feed tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Bounded channel capacity between sources and the engine loop
    #[serde(default = "default_feed_capacity")]
    pub capacity: usize,

    /// Behavior when the channel is full
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

fn default_feed_capacity() -> usize {
    256
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            capacity: default_feed_capacity(),
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Feed overflow behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the arriving event, count it, never block the sensor thread
    #[default]
    DropNewest,
    /// Block the producer until room frees up
    Block,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSONL file output
    File,
    /// Network output (UDP)
    Udp,
}

/// Logging/metrics defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Log format name (pretty/compact/json)
    #[serde(default)]
    pub log_format: Option<String>,

    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl RigBlueprint {
    /// Lower the blueprint into the engine's `SyncConfig`.
    pub fn to_sync_config(&self) -> SyncConfig {
        let mut bounds = HashMap::new();
        let mut choices = HashMap::new();

        for spec in &self.sensors {
            let bound = match self.sync.mode {
                AlignMode::Window => {
                    let ms = spec.window_ms.unwrap_or(self.sync.window_ms);
                    BufferBound::Window {
                        window_ns: (ms * 1_000_000.0) as i64,
                    }
                }
                AlignMode::Pull => BufferBound::Capacity {
                    max_len: spec.capacity.unwrap_or(self.sync.capacity),
                },
            };
            bounds.insert(spec.kind, bound);

            let choice = spec.interpolator.unwrap_or(if spec.kind.is_vector() {
                self.sync.interpolator
            } else {
                InterpolatorChoice::Direct
            });
            choices.insert(spec.kind, choice);
        }

        let stale_threshold_ns = self
            .sync
            .stale_detection
            .then(|| (self.sync.stale_threshold_ms * 1_000_000.0) as i64);

        SyncConfig {
            reference: self.sync.reference,
            mode: self.sync.mode,
            bounds,
            interpolation: InterpolationConfig {
                enabled: self.sync.interpolation,
                choices,
            },
            stale_threshold_ns,
            stop_when_filled_buffer: self.sync.stop_when_filled_buffer,
            skip_when_processing: self.sync.skip_when_processing,
        }
    }

    /// Spec for `kind`, if the rig declares one.
    pub fn sensor(&self, kind: SensorKind) -> Option<&SensorSpec> {
        self.sensors.iter().find(|spec| spec.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sensor(kind: SensorKind, rate_hz: f64) -> SensorSpec {
        SensorSpec {
            kind,
            variant: SensorVariant::Calibrated,
            rate_hz,
            window_ms: None,
            capacity: None,
            interpolator: None,
            accuracy: Accuracy::High,
            source: SourceBackend::default(),
        }
    }

    fn sample_blueprint() -> RigBlueprint {
        RigBlueprint {
            version: ConfigVersion::V1,
            rig: RigConfig {
                name: "bench-rig".into(),
                description: None,
            },
            sensors: vec![
                sample_sensor(SensorKind::Accelerometer, 200.0),
                sample_sensor(SensorKind::Gyroscope, 200.0),
                sample_sensor(SensorKind::Attitude, 100.0),
            ],
            sync: SyncSettings {
                reference: SensorKind::Accelerometer,
                mode: AlignMode::Window,
                window_ms: 100.0,
                capacity: 64,
                interpolation: true,
                interpolator: InterpolatorChoice::Linear,
                stale_detection: false,
                stale_threshold_ms: 500.0,
                stop_when_filled_buffer: false,
                skip_when_processing: false,
            },
            feed: FeedSettings::default(),
            sinks: vec![],
            observability: ObservabilitySettings::default(),
        }
    }

    #[test]
    fn sync_config_window_defaults() {
        let blueprint = sample_blueprint();
        let config = blueprint.to_sync_config();

        assert_eq!(config.reference, SensorKind::Accelerometer);
        assert_eq!(config.bounds.len(), 3);
        assert_eq!(
            config.bounds[&SensorKind::Gyroscope],
            BufferBound::Window {
                window_ns: 100_000_000
            }
        );
        assert_eq!(
            config.interpolation.choice_for(SensorKind::Gyroscope),
            InterpolatorChoice::Linear
        );
        assert_eq!(
            config.interpolation.choice_for(SensorKind::Attitude),
            InterpolatorChoice::Direct
        );
        assert_eq!(config.stale_threshold_ns, None);
    }

    #[test]
    fn sync_config_pull_overrides() {
        let mut blueprint = sample_blueprint();
        blueprint.sync.mode = AlignMode::Pull;
        blueprint.sync.stale_detection = true;
        blueprint.sync.stale_threshold_ms = 250.0;
        blueprint.sensors[1].capacity = Some(16);
        blueprint.sensors[1].interpolator = Some(InterpolatorChoice::Quadratic);

        let config = blueprint.to_sync_config();
        assert_eq!(config.mode, AlignMode::Pull);
        assert_eq!(
            config.bounds[&SensorKind::Accelerometer],
            BufferBound::Capacity { max_len: 64 }
        );
        assert_eq!(
            config.bounds[&SensorKind::Gyroscope],
            BufferBound::Capacity { max_len: 16 }
        );
        assert_eq!(
            config.interpolation.choice_for(SensorKind::Gyroscope),
            InterpolatorChoice::Quadratic
        );
        assert_eq!(config.stale_threshold_ns, Some(250_000_000));
    }

    #[test]
    fn blueprint_defaults_fill_in_from_json() {
        let json = r#"{
            "rig": { "name": "test-rig" },
            "sensors": [
                { "kind": "gravity", "rate_hz": 50.0 },
                {
                    "kind": "magnetometer",
                    "variant": "uncalibrated",
                    "source": { "backend": "synthetic", "amplitude": 40.0, "noise": 0.5 }
                }
            ],
            "sync": { "reference": "gravity", "mode": "window", "window_ms": 40.0 },
            "sinks": [ { "name": "console", "sink_type": "log" } ]
        }"#;

        let blueprint: RigBlueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.rig.name, "test-rig");
        assert_eq!(blueprint.sensors.len(), 2);
        assert_eq!(blueprint.sensors[0].accuracy, Accuracy::High);
        assert_eq!(blueprint.sensors[1].variant, SensorVariant::Uncalibrated);
        assert_eq!(blueprint.sync.reference, SensorKind::Gravity);
        assert!(blueprint.sync.interpolation);
        assert_eq!(blueprint.feed.capacity, 256);
        assert_eq!(blueprint.sinks[0].sink_type, SinkType::Log);
        assert_eq!(blueprint.sinks[0].queue_capacity, 100);
        match blueprint.sensors[1].source {
            SourceBackend::Synthetic { amplitude, noise } => {
                assert_eq!(amplitude, 40.0);
                assert_eq!(noise, 0.5);
            }
            _ => panic!("expected synthetic backend"),
        }
    }
}

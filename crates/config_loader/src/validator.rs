//! Blueprint validation.
//!
//! Rules:
//! - sensor kinds unique, at least one sensor
//! - sync.reference declared among the sensors
//! - rate_hz > 0
//! - windows/capacities/stale threshold positive for the active mode
//! - feed capacity > 0
//! - sink names non-empty and unique
//! - replay backends point at a non-empty path

use std::collections::HashSet;

use contracts::{AlignMode, ContractError, RigBlueprint, SourceBackend};

/// Validate a RigBlueprint.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    validate_sensor_kinds(blueprint)?;
    validate_sensor_rates(blueprint)?;
    validate_sources(blueprint)?;
    validate_sync_settings(blueprint)?;
    validate_feed(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Sensor list non-empty, kinds unique
fn validate_sensor_kinds(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    if blueprint.sensors.is_empty() {
        return Err(ContractError::config_validation(
            "sensors",
            "at least one sensor is required",
        ));
    }

    let mut seen = HashSet::new();
    for spec in &blueprint.sensors {
        if !seen.insert(spec.kind) {
            return Err(ContractError::config_validation(
                format!("sensors[kind={}]", spec.kind),
                "duplicate sensor kind",
            ));
        }
    }
    Ok(())
}

/// Sampling-rate hints must be positive
fn validate_sensor_rates(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    for spec in &blueprint.sensors {
        if spec.rate_hz <= 0.0 {
            return Err(ContractError::config_validation(
                format!("sensors[{}].rate_hz", spec.kind),
                format!("rate_hz must be > 0, got {}", spec.rate_hz),
            ));
        }
    }
    Ok(())
}

/// Backend parameters must be usable
fn validate_sources(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    for spec in &blueprint.sensors {
        match &spec.source {
            SourceBackend::Synthetic { noise, .. } => {
                if *noise < 0.0 {
                    return Err(ContractError::config_validation(
                        format!("sensors[{}].source.noise", spec.kind),
                        format!("noise must be >= 0, got {noise}"),
                    ));
                }
            }
            SourceBackend::Replay { path, .. } => {
                if path.as_os_str().is_empty() {
                    return Err(ContractError::config_validation(
                        format!("sensors[{}].source.path", spec.kind),
                        "replay path cannot be empty",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Sync strategy sanity
fn validate_sync_settings(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    let sync = &blueprint.sync;

    if blueprint.sensor(sync.reference).is_none() {
        return Err(ContractError::config_validation(
            "sync.reference",
            format!("reference kind '{}' is not declared in sensors", sync.reference),
        ));
    }

    match sync.mode {
        AlignMode::Window => {
            if sync.window_ms <= 0.0 {
                return Err(ContractError::config_validation(
                    "sync.window_ms",
                    format!("window_ms must be > 0, got {}", sync.window_ms),
                ));
            }
            for spec in &blueprint.sensors {
                if let Some(window_ms) = spec.window_ms {
                    if window_ms <= 0.0 {
                        return Err(ContractError::config_validation(
                            format!("sensors[{}].window_ms", spec.kind),
                            format!("window_ms must be > 0, got {window_ms}"),
                        ));
                    }
                }
            }
        }
        AlignMode::Pull => {
            if sync.capacity == 0 {
                return Err(ContractError::config_validation(
                    "sync.capacity",
                    "capacity must be > 0",
                ));
            }
            for spec in &blueprint.sensors {
                if spec.capacity == Some(0) {
                    return Err(ContractError::config_validation(
                        format!("sensors[{}].capacity", spec.kind),
                        "capacity must be > 0",
                    ));
                }
            }
        }
    }

    if sync.stale_detection && sync.stale_threshold_ms <= 0.0 {
        return Err(ContractError::config_validation(
            "sync.stale_threshold_ms",
            format!(
                "stale_threshold_ms must be > 0 when stale_detection is enabled, got {}",
                sync.stale_threshold_ms
            ),
        ));
    }

    Ok(())
}

/// Feed channel sanity
fn validate_feed(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    if blueprint.feed.capacity == 0 {
        return Err(ContractError::config_validation(
            "feed.capacity",
            "feed capacity must be > 0",
        ));
    }
    Ok(())
}

/// Sink entries must be addressable
fn validate_sinks(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", idx),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        Accuracy, ConfigVersion, FeedSettings, InterpolatorChoice, ObservabilitySettings,
        RigConfig, SensorKind, SensorSpec, SensorVariant, SinkConfig, SinkType, SyncSettings,
    };

    fn sensor(kind: SensorKind) -> SensorSpec {
        SensorSpec {
            kind,
            variant: SensorVariant::Calibrated,
            rate_hz: 100.0,
            window_ms: None,
            capacity: None,
            interpolator: None,
            accuracy: Accuracy::High,
            source: SourceBackend::default(),
        }
    }

    fn minimal_blueprint() -> RigBlueprint {
        RigBlueprint {
            version: ConfigVersion::V1,
            rig: RigConfig {
                name: "rig".into(),
                description: None,
            },
            sensors: vec![
                sensor(SensorKind::Accelerometer),
                sensor(SensorKind::Gyroscope),
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
            sinks: vec![SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                queue_capacity: 100,
                params: Default::default(),
            }],
            observability: ObservabilitySettings::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_empty_sensor_list() {
        let mut bp = minimal_blueprint();
        bp.sensors.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one sensor"), "got: {err}");
    }

    #[test]
    fn test_duplicate_sensor_kind() {
        let mut bp = minimal_blueprint();
        bp.sensors.push(sensor(SensorKind::Gyroscope));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate sensor kind"), "got: {err}");
    }

    #[test]
    fn test_invalid_rate() {
        let mut bp = minimal_blueprint();
        bp.sensors[0].rate_hz = -5.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("rate_hz must be > 0"), "got: {err}");
    }

    #[test]
    fn test_reference_not_declared() {
        let mut bp = minimal_blueprint();
        bp.sync.reference = SensorKind::Magnetometer;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("not declared"), "got: {err}");
    }

    #[test]
    fn test_non_positive_window() {
        let mut bp = minimal_blueprint();
        bp.sync.window_ms = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("window_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_capacity_override() {
        let mut bp = minimal_blueprint();
        bp.sync.mode = AlignMode::Pull;
        bp.sensors[1].capacity = Some(0);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("capacity must be > 0"), "got: {err}");
    }

    #[test]
    fn test_stale_threshold_requires_positive() {
        let mut bp = minimal_blueprint();
        bp.sync.stale_detection = true;
        bp.sync.stale_threshold_ms = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("stale_threshold_ms"), "got: {err}");
    }

    #[test]
    fn test_empty_replay_path() {
        let mut bp = minimal_blueprint();
        bp.sensors[0].source = SourceBackend::Replay {
            path: "".into(),
            paced: false,
        };
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("replay path"), "got: {err}");
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(bp.sinks[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate sink name"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}

//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{AlignMode, RigBlueprint, SensorSpec, SourceBackend};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    rig: RigInfo,
    sensor_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
    sync_settings: SyncInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    observability: Option<ObservabilityInfo>,
}

#[derive(Serialize)]
struct RigInfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize)]
struct SensorInfo {
    kind: String,
    variant: String,
    rate_hz: f64,
    bound: String,
    interpolator: String,
    source: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct SyncInfo {
    reference: String,
    mode: String,
    interpolation: bool,
    interpolator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stale_threshold_ms: Option<f64>,
    stop_when_filled_buffer: bool,
    skip_when_processing: bool,
}

#[derive(Serialize)]
struct ObservabilityInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    log_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &RigBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sensors = if args.sensors {
        blueprint
            .sensors
            .iter()
            .map(|spec| SensorInfo {
                kind: spec.kind.to_string(),
                variant: spec.variant.as_str().to_string(),
                rate_hz: spec.rate_hz,
                bound: describe_bound(blueprint, spec),
                interpolator: describe_interpolator(blueprint, spec),
                source: describe_source(&spec.source),
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    let sync = &blueprint.sync;
    let sync_settings = SyncInfo {
        reference: sync.reference.to_string(),
        mode: format!("{:?}", sync.mode).to_lowercase(),
        interpolation: sync.interpolation,
        interpolator: format!("{:?}", sync.interpolator).to_lowercase(),
        stale_threshold_ms: sync.stale_detection.then_some(sync.stale_threshold_ms),
        stop_when_filled_buffer: sync.stop_when_filled_buffer,
        skip_when_processing: sync.skip_when_processing,
    };

    let obs = &blueprint.observability;
    let observability = if obs.log_format.is_some() || obs.metrics_port.is_some() {
        Some(ObservabilityInfo {
            log_format: obs.log_format.clone(),
            metrics_port: obs.metrics_port,
        })
    } else {
        None
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        rig: RigInfo {
            name: blueprint.rig.name.clone(),
            description: blueprint.rig.description.clone(),
        },
        sensor_count: blueprint.sensors.len(),
        sensors,
        sinks,
        sync_settings,
        observability,
    }
}

/// Effective retention bound for a sensor, as display text
fn describe_bound(blueprint: &RigBlueprint, spec: &SensorSpec) -> String {
    match blueprint.sync.mode {
        AlignMode::Window => {
            let ms = spec.window_ms.unwrap_or(blueprint.sync.window_ms);
            format!("window {} ms", ms)
        }
        AlignMode::Pull => {
            let capacity = spec.capacity.unwrap_or(blueprint.sync.capacity);
            format!("capacity {}", capacity)
        }
    }
}

/// Effective interpolator for a sensor, as display text
fn describe_interpolator(blueprint: &RigBlueprint, spec: &SensorSpec) -> String {
    let choice = spec.interpolator.unwrap_or(if spec.kind.is_vector() {
        blueprint.sync.interpolator
    } else {
        contracts::InterpolatorChoice::Direct
    });
    format!("{:?}", choice).to_lowercase()
}

fn describe_source(source: &SourceBackend) -> String {
    match source {
        SourceBackend::Synthetic { amplitude, noise } => {
            format!("synthetic (amplitude {}, noise {})", amplitude, noise)
        }
        SourceBackend::Replay { path, paced } => {
            if *paced {
                format!("replay {} (paced)", path.display())
            } else {
                format!("replay {}", path.display())
            }
        }
    }
}

fn print_config_info(blueprint: &RigBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Motion Syncer Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Rig identity
    println!("📍 Rig");
    println!("   ├─ Version: {:?}", blueprint.version);
    match &blueprint.rig.description {
        Some(description) => {
            println!("   ├─ Name: {}", blueprint.rig.name);
            println!("   └─ Description: {}", description);
        }
        None => {
            println!("   └─ Name: {}", blueprint.rig.name);
        }
    }

    // Sensors
    println!("\n📡 Sensors ({})", blueprint.sensors.len());
    for (i, spec) in blueprint.sensors.iter().enumerate() {
        let is_last = i == blueprint.sensors.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({}, {} Hz)",
            prefix,
            spec.kind,
            spec.variant.as_str(),
            spec.rate_hz
        );

        if args.sensors {
            println!("   {}  ├─ bound: {}", child_prefix, describe_bound(blueprint, spec));
            println!(
                "   {}  ├─ interpolator: {}",
                child_prefix,
                describe_interpolator(blueprint, spec)
            );
            println!("   {}  └─ source: {}", child_prefix, describe_source(&spec.source));
        }
    }

    // Sync Settings
    let sync = &blueprint.sync;
    println!("\n⚙️  Sync Settings");
    println!("   ├─ Reference: {}", sync.reference);
    match sync.mode {
        AlignMode::Window => {
            println!("   ├─ Mode: window ({} ms default)", sync.window_ms);
        }
        AlignMode::Pull => {
            println!("   ├─ Mode: pull (capacity {} default)", sync.capacity);
        }
    }
    if sync.interpolation {
        println!(
            "   ├─ Interpolation: {}",
            format!("{:?}", sync.interpolator).to_lowercase()
        );
    } else {
        println!("   ├─ Interpolation: disabled");
    }
    if sync.stale_detection {
        println!("   ├─ Stale Detection: {} ms", sync.stale_threshold_ms);
    } else {
        println!("   ├─ Stale Detection: disabled");
    }
    println!("   ├─ Stop When Filled: {}", sync.stop_when_filled_buffer);
    println!("   └─ Skip When Processing: {}", sync.skip_when_processing);

    // Sinks
    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}

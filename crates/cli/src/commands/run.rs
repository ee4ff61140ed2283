//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        rig = %blueprint.rig.name,
        reference = %blueprint.sync.reference,
        sensors = blueprint.sensors.len(),
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Metrics port: CLI flag overrides the blueprint, 0 disables
    let metrics_port = match args.metrics_port {
        Some(0) => None,
        Some(port) => {
            info!(port, "Overriding metrics port from CLI");
            Some(port)
        }
        None => blueprint.observability.metrics_port,
    };

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_synced: if args.max_synced == 0 {
            None
        } else {
            Some(args.max_synced)
        },
        duration: if args.duration == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration))
        },
        buffer_size: args.buffer_size,
        metrics_port,
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    // Run pipeline with shutdown signal
    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        synced = stats.synced_emitted,
                        samples = stats.samples_received,
                        duration_secs = stats.duration.as_secs_f64(),
                        rate_hz = format!("{:.2}", stats.rate_hz()),
                        "Pipeline completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Motion Syncer finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::RigBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Rig:");
    println!("  Name: {}", blueprint.rig.name);
    if let Some(ref description) = blueprint.rig.description {
        println!("  Description: {}", description);
    }

    println!("\nSensors ({}):", blueprint.sensors.len());
    for spec in &blueprint.sensors {
        println!(
            "  - {} ({}, {} Hz)",
            spec.kind,
            spec.variant.as_str(),
            spec.rate_hz
        );
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    let sync = &blueprint.sync;
    println!("\nSync Settings:");
    println!("  Reference: {}", sync.reference);
    println!("  Mode: {}", format!("{:?}", sync.mode).to_lowercase());
    if sync.interpolation {
        println!(
            "  Interpolation: {}",
            format!("{:?}", sync.interpolator).to_lowercase()
        );
    } else {
        println!("  Interpolation: disabled");
    }

    println!();
}

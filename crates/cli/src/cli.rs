//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Motion Syncer - Multi-sensor sample synchronization pipeline
#[derive(Parser, Debug)]
#[command(
    name = "motion-syncer",
    author,
    version,
    about = "Inertial sensor sample synchronization pipeline",
    long_about = "A sample synchronization engine for inertial sensor streams.\n\n\
                  Builds sensor streams from a rig blueprint, aligns companion \n\
                  streams to a reference stream at single timestamps, and \n\
                  dispatches the composite measurements to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MOTION_SYNCER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MOTION_SYNCER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the synchronization pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to rig blueprint file (TOML or JSON)
    #[arg(short, long, default_value = "rig.toml", env = "MOTION_SYNCER_CONFIG")]
    pub config: PathBuf,

    /// Maximum number of synced measurements to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "MOTION_SYNCER_MAX_SYNCED")]
    pub max_synced: u64,

    /// Run duration in seconds (0 = run until Ctrl-C)
    #[arg(long, default_value = "0", env = "MOTION_SYNCER_DURATION")]
    pub duration: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between the engine and the dispatcher
    #[arg(long, default_value = "100", env = "MOTION_SYNCER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Override metrics server port from configuration (0 = disabled)
    #[arg(long, env = "MOTION_SYNCER_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to blueprint file to validate
    #[arg(short, long, default_value = "rig.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to blueprint file
    #[arg(short, long, default_value = "rig.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed sensor information
    #[arg(long)]
    pub sensors: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Capture Rig - synchronized multi-sensor recording
#[derive(Parser, Debug)]
#[command(
    name = "capture-rig",
    author,
    version,
    about = "Synchronized multi-sensor capture rig",
    long_about = "Records RGB / high-resolution video, thermal, depth and audio streams \n\
                  for long unattended sessions.\n\n\
                  Every sensor starts at a common t=0 after a warm-up period and writes \n\
                  time-chunked files into its own output directory."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CAPTURE_RIG_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CAPTURE_RIG_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a capture session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Map connected video devices to roles
    Resolve(ResolveArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "capture.toml",
        env = "CAPTURE_RIG_CONFIG"
    )]
    pub config: PathBuf,

    /// Session name, used as chunk file prefix
    #[arg(short, long, env = "CAPTURE_RIG_SESSION")]
    pub name: Option<String>,

    /// Capture duration in seconds (negative = until interrupted)
    #[arg(short, long, allow_negative_numbers = true, env = "CAPTURE_RIG_DURATION")]
    pub duration: Option<i64>,

    /// Warm-up before the common start, in seconds
    #[arg(long, env = "CAPTURE_RIG_WARMUP")]
    pub warmup: Option<f64>,

    /// Output root directory
    #[arg(short, long, env = "CAPTURE_RIG_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Resolve video device channels from udev before starting
    #[arg(long)]
    pub resolve: bool,

    /// Validate configuration and exit without capturing
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CAPTURE_RIG_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "capture.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "capture.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Include disabled sensors
    #[arg(long)]
    pub all: bool,
}

/// Arguments for the `resolve` command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "capture.toml")]
    pub config: PathBuf,

    /// Write resolved channel indices back to the configuration file
    #[arg(long)]
    pub write: bool,

    /// Output mapping as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

//! CLI argument definitions
//!
//! All Clap derive structs for `trafficlight` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::ConfigOverrides;
use crate::observability::LogFormat;
use crate::phase::DeliveryOrder;

// ============================================================================
// Root CLI
// ============================================================================

/// Randomized traffic signal with blocking green-light observers.
#[derive(Parser, Debug)]
#[command(name = "trafficlight", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TRAFFICLIGHT_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "TRAFFICLIGHT_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a signal and a set of observers waiting for green.
    Run(RunArgs),

    /// Validate a configuration file without running the signal.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Run Command
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "TRAFFICLIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Shortest phase duration (e.g. `4s`, `4500ms`).
    #[arg(long, env = "TRAFFICLIGHT_MIN_CYCLE")]
    pub min_cycle: Option<String>,

    /// Longest phase duration (e.g. `6s`).
    #[arg(long, env = "TRAFFICLIGHT_MAX_CYCLE")]
    pub max_cycle: Option<String>,

    /// Which pending phase event an observer receives first.
    #[arg(long, env = "TRAFFICLIGHT_ORDER")]
    pub order: Option<DeliveryOrder>,

    /// Seed the cycle RNG for reproducible timing.
    #[arg(long, env = "TRAFFICLIGHT_SEED")]
    pub seed: Option<u64>,

    /// Number of observer threads waiting for green.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=1024))]
    pub observers: u32,

    /// Green events each observer waits for before finishing.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub greens: u32,

    /// Write JSONL lifecycle and phase events to this file.
    #[arg(long, env = "TRAFFICLIGHT_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long, env = "TRAFFICLIGHT_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl RunArgs {
    /// Collects the flags that override config-file values.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_cycle: self.min_cycle.clone(),
            max_cycle: self.max_cycle.clone(),
            order: self.order,
            seed: self.seed,
        }
    }
}

// ============================================================================
// Validate Command
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "TRAFFICLIGHT_CONFIG")]
    pub config: PathBuf,

    /// Output format.
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Version Command
// ============================================================================

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for informational commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

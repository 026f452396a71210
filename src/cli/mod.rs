//! CLI interface and argument parsing
//!
//! The scheduler invokes `examsync sync` once per run; the remaining commands
//! are operator tools.

pub mod commands;

use clap::{Parser, Subcommand};

/// examsync - Biologix exam sync and clinic alerts
#[derive(Parser, Debug)]
#[command(name = "examsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "examsync.toml", env = "EXAMSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "EXAMSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sync from the provider into the clinic database
    Sync(commands::sync::SyncArgs),

    /// Evaluate, list and resolve operational alerts
    Alerts(commands::alerts::AlertsArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

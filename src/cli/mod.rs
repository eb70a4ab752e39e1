//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Compaction Gate using clap.

pub mod commands;

use crate::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use clap::{Parser, Subcommand};

/// Compaction Gate - lease-based compaction trigger for Iceberg tables
#[derive(Parser, Debug)]
#[command(name = "compaction-gate")]
#[command(version, about, long_about = None)]
#[command(author = "Compaction Gate Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = CONFIG_PATH_ENV)]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "COMPACTION_GATE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one batch of change events (file or stdin)
    Handle(commands::handle::HandleArgs),

    /// Drain deferred retries from the delay channel
    Poll(commands::poll::PollArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show leases and pending retry markers
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

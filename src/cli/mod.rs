//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Shroud using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Shroud - privacy-preserving data preparation
#[derive(Parser, Debug)]
#[command(name = "shroud")]
#[command(version, about, long_about = None)]
#[command(author = "Shroud Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "shroud.toml", env = "SHROUD_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SHROUD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pseudonymize and k-anonymize a dataset
    Process(commands::process::ProcessArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

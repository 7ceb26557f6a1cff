//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Shroud configuration file.

use super::{EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Input: {}", config.dataset.input_path.display());
        println!("  Output: {}", config.dataset.output_path.display());
        println!("  Free-text Columns: {:?}", config.free_text_columns());
        println!("  Quasi-identifiers: {:?}", config.quasi_columns());
        println!(
            "  Protected Labels: {:?}",
            config
                .pseudonymization
                .protected_labels
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
        );
        println!("  Salt: [REDACTED]");
        println!("  k: {}", config.anonymization.k);
        for rule in &config.anonymization.rules {
            println!("    {}: {} level(s)", rule.column, rule.levels.len());
        }
        println!("  Workers: {}", config.processing.workers);
        println!(
            "  Audit Log: {}",
            if config.audit.enabled {
                config.audit.log_path.display().to_string()
            } else {
                "disabled".to_string()
            }
        );
        println!();
        Ok(EXIT_SUCCESS)
    }
}

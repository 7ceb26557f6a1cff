//! Process command implementation
//!
//! This module implements the `process` command: one privacy run over the
//! configured dataset.

use super::{EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_INTERRUPTED, EXIT_SUCCESS};
use crate::anonymization::PrivacyEngine;
use crate::config::{load_config, ShroudConfig};
use crate::domain::ShroudError;
use clap::Args;
use std::path::PathBuf;
use tokio::sync::watch;

/// Arguments for the process command
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Override the input CSV path
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override the output CSV path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the target k
    #[arg(long)]
    pub k: Option<usize>,

    /// Override the number of pseudonymization workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Run the full pipeline and print the report without writing output
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON instead of the console summary
    #[arg(long)]
    pub json: bool,
}

impl ProcessArgs {
    /// Execute the process command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting process command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(EXIT_CONFIG_ERROR);
        }

        if config.application.dry_run {
            tracing::info!("Dry run mode enabled - no output will be written");
            println!("🔍 DRY RUN MODE - No output file will be written");
            println!();
        }

        let engine = match PrivacyEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize privacy engine");
                eprintln!("Failed to initialize: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        println!("🚀 Processing {}...", engine.config().dataset.input_path.display());

        let report = match engine.run(shutdown_signal).await {
            Ok(report) => report,
            Err(ShroudError::Cancelled) => {
                println!();
                println!("⚠️  Run interrupted. No output was written.");
                println!();
                tracing::info!("Run interrupted by user signal");
                return Ok(EXIT_INTERRUPTED);
            }
            Err(e) => {
                eprintln!("Run failed: {e}");
                eprintln!("No output was written.");
                return Ok(EXIT_FATAL);
            }
        };

        if self.json {
            println!("{}", report.format_json()?);
        } else {
            print!("{}", report.format_console());
        }

        if report.dry_run {
            println!("✅ Dry run completed");
        } else {
            println!("✅ Run completed successfully!");
        }
        Ok(EXIT_SUCCESS)
    }

    /// Apply command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut ShroudConfig) {
        if let Some(input) = &self.input {
            tracing::info!(input = %input.display(), "Overriding input path from CLI");
            config.dataset.input_path = input.clone();
        }

        if let Some(output) = &self.output {
            tracing::info!(output = %output.display(), "Overriding output path from CLI");
            config.dataset.output_path = output.clone();
        }

        if let Some(k) = self.k {
            tracing::info!(k, "Overriding k from CLI");
            config.anonymization.k = k;
        }

        if let Some(workers) = self.workers {
            tracing::info!(workers, "Overriding worker count from CLI");
            config.processing.workers = workers;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn args() -> ProcessArgs {
        ProcessArgs {
            input: None,
            output: None,
            k: None,
            workers: None,
            dry_run: false,
            json: false,
        }
    }

    fn config() -> ShroudConfig {
        parse_config(
            r#"
[dataset]
input_path = "in.csv"
output_path = "out.csv"

[pseudonymization]
salt = "s1"

[anonymization]
k = 5
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = config();
        let args = ProcessArgs {
            input: Some(PathBuf::from("other.csv")),
            k: Some(10),
            workers: Some(1),
            dry_run: true,
            ..args()
        };

        args.apply_overrides(&mut config);

        assert_eq!(config.dataset.input_path, PathBuf::from("other.csv"));
        assert_eq!(config.dataset.output_path, PathBuf::from("out.csv"));
        assert_eq!(config.anonymization.k, 10);
        assert_eq!(config.processing.workers, 1);
        assert!(config.application.dry_run);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = config();
        args().apply_overrides(&mut config);

        assert_eq!(config.anonymization.k, 5);
        assert!(!config.application.dry_run);
    }

    #[tokio::test]
    async fn test_missing_config_is_config_error() {
        let (_tx, rx) = watch::channel(false);
        let code = args()
            .execute("/nonexistent/shroud.toml", rx)
            .await
            .unwrap();
        assert_eq!(code, EXIT_CONFIG_ERROR);
    }
}

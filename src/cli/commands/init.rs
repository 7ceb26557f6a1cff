//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG_ERROR, EXIT_FATAL, EXIT_SUCCESS};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "shroud.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Shroud configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG_ERROR);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your dataset paths and column roles", self.output);
                println!("  2. Create a .env file with SHROUD_SALT set to a long random value");
                println!("  3. Validate configuration: shroud validate-config");
                println!("  4. Preview the run: shroud process --dry-run");
                println!("  5. Run: shroud process");
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate the sample configuration
    pub(crate) fn generate_config() -> String {
        r#"# Shroud Configuration File
# Pseudonymization and k-anonymity for tabular data

[application]
log_level = "info"
dry_run = false

[dataset]
input_path = "customers.csv"
output_path = "customers_private.csv"
delimiter = ","

# Column roles: free_text | quasi_identifier | passthrough
# Columns not listed here are passed through unchanged.
[dataset.columns]
name = "free_text"
email = "free_text"
phone = "free_text"
address = "free_text"
comments = "free_text"
age = "quasi_identifier"
zip = "quasi_identifier"

[pseudonymization]
# Never commit the salt. Without it the email hashes cannot be linked.
salt = "${SHROUD_SALT}"
protected_labels = ["PERSON", "EMAIL", "PHONE", "ADDRESS"]
hash_labels = ["EMAIL"]
token_suffix_width = 6
# token_seed = 42

[pseudonymization.token_prefixes]
PERSON = "CUST"
PHONE = "PHONE"
ADDRESS = "ADDR"

[detector]
# pattern_library = "patterns/entity_patterns.toml"
# confidence_threshold = 0.7

# [detector.lexicon]
# PERSON = ["John Smith"]

[anonymization]
k = 5

# Escalation order follows the order of the rules below.
[[anonymization.rules]]
column = "age"
levels = [
    { transform = "bins", edges = [0, 18, 30, 40, 50, 60] },
    { transform = "range", width = 20, cap = 60 },
    { transform = "suppress" },
]

[[anonymization.rules]]
column = "zip"
levels = [
    { transform = "prefix", keep = 3, width = 5 },
    { transform = "prefix", keep = 2, width = 5 },
    { transform = "suppress" },
]

[processing]
workers = 4

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"

[audit]
enabled = true
log_path = "./audit/shroud.log"
json_format = true
record_details = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use tempfile::TempDir;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "shroud.toml".to_string(),
            force: false,
        };

        assert_eq!(args.output, "shroud.toml");
        assert!(!args.force);
    }

    #[test]
    fn test_generated_config_parses() {
        std::env::set_var("SHROUD_SALT", "generated-config-test-salt");
        let config = parse_config(&InitArgs::generate_config()).unwrap();

        assert_eq!(config.anonymization.k, 5);
        assert_eq!(config.quasi_columns(), vec!["age", "zip"]);
        assert_eq!(config.anonymization.rules[0].levels.len(), 3);
    }

    #[tokio::test]
    async fn test_existing_file_not_overwritten_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shroud.toml");
        fs::write(&path, "keep me").unwrap();

        let args = InitArgs {
            output: path.to_str().unwrap().to_string(),
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), EXIT_CONFIG_ERROR);
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().await.unwrap(), EXIT_SUCCESS);
        assert!(fs::read_to_string(&path).unwrap().contains("[anonymization]"));
    }
}

//! Configuration management for Shroud.
//!
//! TOML configuration with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `SHROUD_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shroud::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("shroud.toml")?;
//!
//! println!("Input: {}", config.dataset.input_path.display());
//! println!("k = {}", config.anonymization.k);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level, dry run
//! - [`DatasetConfig`] - input/output CSV and column roles
//! - [`PseudonymizationConfig`] - salt, protected labels, token format
//! - [`DetectorConfig`] - pattern library and lexicon
//! - [`AnonymizationConfig`] - k and generalization rules
//! - [`ProcessingConfig`] - worker count
//! - [`LoggingConfig`] - file logging
//! - [`AuditConfig`] - audit log
//!
//! # Example Configuration
//!
//! ```toml
//! [dataset]
//! input_path = "customers.csv"
//! output_path = "customers_private.csv"
//!
//! [dataset.columns]
//! name = "free_text"
//! comments = "free_text"
//! age = "quasi_identifier"
//! zip = "quasi_identifier"
//!
//! [pseudonymization]
//! salt = "${SHROUD_SALT}"
//! protected_labels = ["PERSON", "EMAIL", "PHONE", "ADDRESS"]
//!
//! [anonymization]
//! k = 5
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use crate::anonymization::config::{
    AnonymizationConfig, AuditConfig, DetectorConfig, PseudonymizationConfig,
};
pub use loader::{load_config, parse_config};
pub use schema::{ApplicationConfig, DatasetConfig, LoggingConfig, ProcessingConfig, ShroudConfig};
pub use secret::{secret_string, SecretString, SecretValue};

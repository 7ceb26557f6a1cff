//! Configuration schema types
//!
//! Root structure mapping the TOML file, plus the sections that are not
//! specific to the privacy pipeline.

use crate::anonymization::config::{
    AnonymizationConfig, AuditConfig, DetectorConfig, PseudonymizationConfig,
};
use crate::domain::ColumnRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main Shroud configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShroudConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Input and output dataset
    pub dataset: DatasetConfig,

    /// Direct identifier replacement
    pub pseudonymization: PseudonymizationConfig,

    /// Entity detector
    #[serde(default)]
    pub detector: DetectorConfig,

    /// k-anonymity
    pub anonymization: AnonymizationConfig,

    /// Worker pool
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit log
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ShroudConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.dataset.validate()?;
        self.pseudonymization
            .validate()
            .map_err(|e| format!("{e:#}"))?;
        self.detector.validate().map_err(|e| format!("{e:#}"))?;
        self.anonymization.validate().map_err(|e| format!("{e:#}"))?;
        self.processing.validate()?;
        self.logging.validate()?;
        self.audit.validate().map_err(|e| format!("{e:#}"))?;

        for column in self.dataset.columns_with_role(ColumnRole::QuasiIdentifier) {
            let has_rule = self
                .anonymization
                .rules
                .iter()
                .any(|rule| rule.column == column);
            if !has_rule {
                return Err(format!(
                    "Quasi-identifier column '{column}' has no entry in [[anonymization.rules]]"
                ));
            }
        }
        Ok(())
    }

    /// Quasi-identifier columns in escalation order (the order of the rules)
    pub fn quasi_columns(&self) -> Vec<String> {
        self.anonymization
            .rules
            .iter()
            .filter(|rule| self.dataset.role_of(&rule.column) == ColumnRole::QuasiIdentifier)
            .map(|rule| rule.column.clone())
            .collect()
    }

    /// Free-text columns
    pub fn free_text_columns(&self) -> Vec<String> {
        self.dataset.columns_with_role(ColumnRole::FreeText)
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (process but don't write the output dataset)
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Dataset input and output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Input CSV file
    pub input_path: PathBuf,

    /// Output CSV file
    pub output_path: PathBuf,

    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Role per column; unlisted columns pass through
    #[serde(default = "default_columns")]
    pub columns: BTreeMap<String, ColumnRole>,
}

impl DatasetConfig {
    fn validate(&self) -> Result<(), String> {
        if self.input_path.as_os_str().is_empty() {
            return Err("dataset.input_path cannot be empty".to_string());
        }
        if self.output_path.as_os_str().is_empty() {
            return Err("dataset.output_path cannot be empty".to_string());
        }
        if self.input_path == self.output_path {
            return Err("dataset.output_path must differ from dataset.input_path".to_string());
        }
        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(format!(
                "dataset.delimiter must be a single ASCII character other than quote or newline, got {:?}",
                self.delimiter
            ));
        }
        Ok(())
    }

    /// Role of a column
    pub fn role_of(&self, column: &str) -> ColumnRole {
        self.columns
            .get(column)
            .copied()
            .unwrap_or(ColumnRole::Passthrough)
    }

    /// Configured columns with a given role
    pub fn columns_with_role(&self, role: ColumnRole) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(column, _)| column.clone())
            .collect()
    }

    /// Delimiter as the byte the CSV reader expects
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Records processed concurrently during pseudonymization
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl ProcessingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.workers == 0 || self.workers > 256 {
            return Err(format!(
                "processing.workers must be between 1 and 256, got {}",
                self.workers
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when file logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_columns() -> BTreeMap<String, ColumnRole> {
    let free_text = ["name", "email", "phone", "address", "comments"]
        .into_iter()
        .map(|c| (c.to_string(), ColumnRole::FreeText));
    let quasi = ["age", "zip"]
        .into_iter()
        .map(|c| (c.to_string(), ColumnRole::QuasiIdentifier));
    free_text.chain(quasi).collect()
}

fn default_workers() -> usize {
    4
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

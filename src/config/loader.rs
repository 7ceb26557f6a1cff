//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ShroudConfig;
use crate::domain::{Result, ShroudError};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ShroudConfig
/// 4. Applies environment variable overrides (SHROUD_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced environment variable is missing, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use shroud::config::loader::load_config;
///
/// let config = load_config("shroud.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ShroudConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ShroudError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ShroudError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text, with the same substitution,
/// override and validation steps as [`load_config`]
pub fn parse_config(contents: &str) -> Result<ShroudConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ShroudConfig = toml::from_str(&contents)
        .map_err(|e| ShroudError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ShroudError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ShroudError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(ShroudError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using SHROUD_* prefix
///
/// Environment variables follow the pattern: SHROUD_<SECTION>_<KEY>
/// For example: SHROUD_DATASET_INPUT_PATH, SHROUD_ANONYMIZATION_K
fn apply_env_overrides(config: &mut ShroudConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("SHROUD_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("SHROUD_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Dataset overrides
    if let Ok(val) = std::env::var("SHROUD_DATASET_INPUT_PATH") {
        config.dataset.input_path = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("SHROUD_DATASET_OUTPUT_PATH") {
        config.dataset.output_path = PathBuf::from(val);
    }

    // Processing overrides
    if let Ok(val) = std::env::var("SHROUD_PROCESSING_WORKERS") {
        if let Ok(workers) = val.parse() {
            config.processing.workers = workers;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("SHROUD_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("SHROUD_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    // Privacy pipeline sections
    let sections = [
        config.pseudonymization.apply_env_overrides(),
        config.detector.apply_env_overrides(),
        config.anonymization.apply_env_overrides(),
        config.audit.apply_env_overrides(),
    ];
    for result in sections {
        result.map_err(|e| ShroudError::Configuration(format!("{e:#}")))?;
    }

    Ok(())
}

//! Privacy pipeline configuration sections
//!
//! `[pseudonymization]`, `[detector]`, `[anonymization]` and `[audit]`.

use crate::anonymization::generalizer::{default_rules, GeneralizationRule};
use crate::anonymization::vault::tokenization::MAX_SUFFIX_WIDTH;
use crate::anonymization::vault::VaultSettings;
use crate::config::SecretString;
use crate::domain::EntityLabel;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Direct-identifier replacement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PseudonymizationConfig {
    /// Salt prepended to hashed identifiers; required
    pub salt: SecretString,

    /// Labels replaced in free text
    #[serde(default = "default_protected_labels")]
    pub protected_labels: BTreeSet<EntityLabel>,

    /// Labels replaced by salted hash instead of a token
    #[serde(default = "default_hash_labels")]
    pub hash_labels: BTreeSet<EntityLabel>,

    /// Digits after the token prefix
    #[serde(default = "default_token_suffix_width")]
    pub token_suffix_width: usize,

    /// Seed for reproducible token assignment
    #[serde(default)]
    pub token_seed: Option<u64>,

    /// Token prefix per label
    #[serde(default = "default_token_prefixes")]
    pub token_prefixes: BTreeMap<EntityLabel, String>,
}

impl PseudonymizationConfig {
    /// Create a configuration with defaults around a salt
    pub fn with_salt(salt: SecretString) -> Self {
        Self {
            salt,
            protected_labels: default_protected_labels(),
            hash_labels: default_hash_labels(),
            token_suffix_width: default_token_suffix_width(),
            token_seed: None,
            token_prefixes: default_token_prefixes(),
        }
    }

    /// Vault settings derived from this section
    pub fn vault_settings(&self) -> VaultSettings {
        VaultSettings {
            hash_labels: self.hash_labels.clone(),
            token_prefixes: self.token_prefixes.clone(),
            token_suffix_width: self.token_suffix_width,
            token_seed: self.token_seed,
        }
    }

    /// Validate the section
    pub fn validate(&self) -> Result<()> {
        if self.salt.expose_secret().is_blank() {
            anyhow::bail!("pseudonymization.salt is required and cannot be empty");
        }
        if self.protected_labels.is_empty() {
            anyhow::bail!("pseudonymization.protected_labels cannot be empty");
        }
        if !(1..=MAX_SUFFIX_WIDTH).contains(&self.token_suffix_width) {
            anyhow::bail!(
                "pseudonymization.token_suffix_width must be between 1 and {}, got {}",
                MAX_SUFFIX_WIDTH,
                self.token_suffix_width
            );
        }
        for (label, prefix) in &self.token_prefixes {
            if prefix.trim().is_empty() {
                anyhow::bail!("Token prefix for label {label} cannot be empty");
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SHROUD_PSEUDONYMIZATION_SALT") {
            self.salt = crate::config::secret_string(val);
        }

        if let Ok(val) = std::env::var("SHROUD_PSEUDONYMIZATION_PROTECTED_LABELS") {
            self.protected_labels = parse_label_list(&val)
                .context("Invalid SHROUD_PSEUDONYMIZATION_PROTECTED_LABELS value")?;
        }

        if let Ok(val) = std::env::var("SHROUD_PSEUDONYMIZATION_TOKEN_SEED") {
            self.token_seed = Some(
                val.parse()
                    .context("Invalid SHROUD_PSEUDONYMIZATION_TOKEN_SEED value")?,
            );
        }

        Ok(())
    }
}

fn parse_label_list(value: &str) -> Result<BTreeSet<EntityLabel>> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| EntityLabel::new(s).map_err(anyhow::Error::msg))
        .collect()
}

/// Entity detector settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Path to a pattern library TOML file; the built-in library is used when unset
    #[serde(default)]
    pub pattern_library: Option<PathBuf>,

    /// Minimum pattern confidence
    #[serde(default)]
    pub confidence_threshold: Option<f64>,

    /// Known terms per label, matched case-insensitively on word boundaries
    #[serde(default)]
    pub lexicon: BTreeMap<EntityLabel, Vec<String>>,
}

impl DetectorConfig {
    /// Validate the section
    pub fn validate(&self) -> Result<()> {
        if let Some(ref path) = self.pattern_library {
            if !path.exists() {
                anyhow::bail!("Pattern library file not found: {}", path.display());
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                anyhow::bail!("Pattern library must be a TOML file: {}", path.display());
            }
        }
        if let Some(threshold) = self.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!(
                    "detector.confidence_threshold must be between 0.0 and 1.0, got {threshold}"
                );
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SHROUD_DETECTOR_PATTERN_LIBRARY") {
            self.pattern_library = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("SHROUD_DETECTOR_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = Some(
                val.parse()
                    .context("Invalid SHROUD_DETECTOR_CONFIDENCE_THRESHOLD value")?,
            );
        }
        Ok(())
    }
}

/// k-anonymity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// Minimum equivalence class size; required
    pub k: usize,

    /// Generalization rules in escalation order
    #[serde(default = "default_rules")]
    pub rules: Vec<GeneralizationRule>,
}

impl AnonymizationConfig {
    /// Validate the section
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            anyhow::bail!("anonymization.k must be at least 1");
        }
        let mut seen = BTreeSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.column.as_str()) {
                anyhow::bail!("Duplicate anonymization rule for column '{}'", rule.column);
            }
            if rule.levels.is_empty() {
                anyhow::bail!(
                    "Anonymization rule for column '{}' needs at least one level",
                    rule.column
                );
            }
            for (index, level) in rule.levels.iter().enumerate() {
                level.validate().map_err(|e| {
                    anyhow::anyhow!("Column '{}' level {}: {}", rule.column, index, e)
                })?;
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SHROUD_ANONYMIZATION_K") {
            self.k = val.parse().context("Invalid SHROUD_ANONYMIZATION_K value")?;
        }
        Ok(())
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON format for audit logs
    #[serde(default = "default_audit_json_format")]
    pub json_format: bool,

    /// Also write one entry per record that had replacements
    #[serde(default)]
    pub record_details: bool,
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/shroud.log")
}

fn default_audit_json_format() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
            json_format: default_audit_json_format(),
            record_details: false,
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("audit.log_path cannot be empty when audit logging is enabled");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SHROUD_AUDIT_ENABLED") {
            self.enabled = val.parse().context("Invalid SHROUD_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("SHROUD_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("SHROUD_AUDIT_JSON_FORMAT") {
            self.json_format = val
                .parse()
                .context("Invalid SHROUD_AUDIT_JSON_FORMAT value")?;
        }

        Ok(())
    }
}

fn default_protected_labels() -> BTreeSet<EntityLabel> {
    [
        EntityLabel::PERSON,
        EntityLabel::EMAIL,
        EntityLabel::PHONE,
        EntityLabel::ADDRESS,
    ]
    .into_iter()
    .map(EntityLabel::known)
    .collect()
}

fn default_hash_labels() -> BTreeSet<EntityLabel> {
    VaultSettings::default().hash_labels
}

fn default_token_prefixes() -> BTreeMap<EntityLabel, String> {
    VaultSettings::default().token_prefixes
}

fn default_token_suffix_width() -> usize {
    VaultSettings::default().token_suffix_width
}

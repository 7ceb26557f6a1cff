//! Domain error types
//!
//! This module defines the error hierarchy for Shroud. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Shroud error type
///
/// This is the primary error type used throughout the application.
/// Every variant except [`ShroudError::Cancelled`] carries a human-readable message.
#[derive(Debug, Error)]
pub enum ShroudError {
    /// Configuration-related errors (missing salt, missing k, missing rules)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Entity detection errors
    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    /// Identifier vault errors
    #[error("Vault error: {0}")]
    Vault(String),

    /// Generalization rule errors
    #[error("Generalization error: {0}")]
    Generalization(String),

    /// Dataset loading or writing errors
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was aborted before emission
    #[error("Run cancelled before output was emitted")]
    Cancelled,
}

/// Entity detector errors
///
/// Any of these aborts the whole run: skipping detection would emit
/// unprotected identifiers.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// Detector could not be initialized or is not reachable
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    /// Detector failed while processing a field
    #[error("Detector failed: {0}")]
    Failed(String),

    /// Detector returned a span that violates the span contract
    #[error("Invalid span [{start}, {end}) over text of {len} bytes: {reason}")]
    InvalidSpan {
        start: usize,
        end: usize,
        len: usize,
        reason: String,
    },

    /// Pattern library could not be loaded
    #[error("Invalid pattern library: {0}")]
    PatternLibrary(String),
}

impl From<std::io::Error> for ShroudError {
    fn from(err: std::io::Error) -> Self {
        ShroudError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ShroudError {
    fn from(err: serde_json::Error) -> Self {
        ShroudError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ShroudError {
    fn from(err: toml::de::Error) -> Self {
        ShroudError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<csv::Error> for ShroudError {
    fn from(err: csv::Error) -> Self {
        ShroudError::Dataset(format!("CSV error: {err}"))
    }
}

//! Privacy pipeline
//!
//! Turns a tabular dataset with direct identifiers and quasi-identifiers into
//! a k-anonymous release.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! - **Detection**: pluggable [`EntityDetector`] returning labelled spans
//! - **Vault**: run-scoped identifier to pseudonym mapping (salted hashes for
//!   hash labels, random tokens for the rest)
//! - **Pseudonymization**: offset-based replacement of detected spans
//! - **Generalization**: per-column ladders of coarsening transforms
//! - **K-anonymity**: level escalation, then suppression of undersized classes
//! - **Audit**: JSON-lines trail with hashed values
//!
//! [`PrivacyEngine`] wires the stages together for one run.
//!
//! # Usage
//!
//! ```rust,no_run
//! use shroud::anonymization::PrivacyEngine;
//!
//! # async fn example(config: shroud::config::ShroudConfig) -> anyhow::Result<()> {
//! let engine = PrivacyEngine::new(config)?;
//! let (_tx, rx) = tokio::sync::watch::channel(false);
//! let report = engine.run(rx).await?;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod detector;
pub mod engine;
pub mod generalizer;
pub mod kanonymity;
pub mod models;
pub mod pseudonymizer;
pub mod report;
pub mod vault;

// Re-export main types
pub use config::{AnonymizationConfig, AuditConfig, DetectorConfig, PseudonymizationConfig};
pub use detector::EntityDetector;
pub use engine::PrivacyEngine;
pub use generalizer::{GeneralizationLevel, GeneralizationRule, Generalizer};
pub use kanonymity::{EnforcementOutcome, KAnonymityCheck, KAnonymityVerifier};
pub use models::EntitySpan;
pub use pseudonymizer::{PseudonymizedField, Pseudonymizer, Replacement};
pub use report::RunReport;
pub use vault::{IdentifierVault, VaultSettings};

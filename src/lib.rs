// Shroud - Privacy-preserving data preparation
// Copyright (c) 2025 Shroud Contributors
// Licensed under the MIT License

//! # Shroud - Pseudonymization and k-anonymity for tabular data
//!
//! Shroud prepares datasets for analytics by removing direct identifiers from
//! free text and coarsening quasi-identifiers until every released record is
//! indistinguishable from at least `k - 1` others.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Detecting** names, emails, phone numbers and addresses in free text
//! - **Pseudonymizing** them consistently within a run (salted hashes for
//!   emails, random `CUST123456`-style tokens for the rest)
//! - **Generalizing** quasi-identifiers such as age and zip code through
//!   configurable ladders of transforms
//! - **Enforcing** k-anonymity by escalating generalization and, as a last
//!   resort, suppressing records
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`anonymization`] - Detection, vault, pseudonymizer, generalizer,
//!   k-anonymity verifier and the pipeline orchestrator
//! - [`dataset`] - CSV input and atomic output
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shroud::anonymization::PrivacyEngine;
//! use shroud::config::load_config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("shroud.toml")?;
//!     let engine = PrivacyEngine::new(config)?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let report = engine.run(shutdown_rx).await?;
//!
//!     println!("Released {} of {} records", report.records_out, report.records_in);
//!     Ok(())
//! }
//! ```
//!
//! ## Pseudonymizing a single field
//!
//! ```rust
//! use shroud::anonymization::detector::regex::RegexDetector;
//! use shroud::anonymization::{IdentifierVault, Pseudonymizer, VaultSettings};
//! use shroud::config::secret_string;
//! use shroud::domain::EntityLabel;
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = IdentifierVault::new(secret_string("s1".to_string()), VaultSettings::default())?;
//! let pseudonymizer = Pseudonymizer::new(Arc::new(RegexDetector::new()?), Arc::new(vault));
//!
//! let labels: BTreeSet<EntityLabel> = [EntityLabel::new("EMAIL")?].into();
//! let field = pseudonymizer.pseudonymize("Reach me at a@b.com", &labels)?;
//! assert!(!field.text.contains("a@b.com"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Shroud uses the [`domain::ShroudError`] type for all library errors.
//! Any detector failure aborts the run: skipping detection would release
//! unprotected identifiers.
//!
//! ## Logging
//!
//! Shroud uses structured logging with the `tracing` crate. Identifier
//! values never appear in log lines; the audit log records salted SHA-256
//! digests only.

pub mod anonymization;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod logging;

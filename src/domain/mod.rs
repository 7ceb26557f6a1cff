//! Domain models and types for Shroud.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Tabular data** ([`Dataset`], [`Record`], [`FieldValue`], [`ColumnRole`])
//! - **Entity labels** ([`EntityLabel`])
//! - **Error types** ([`ShroudError`], [`DetectionError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ShroudError>`]:
//!
//! ```rust
//! use shroud::domain::{Result, ShroudError};
//!
//! fn require_k(k: Option<usize>) -> Result<usize> {
//!     k.ok_or_else(|| ShroudError::Configuration("k is required".to_string()))
//! }
//! ```

pub mod context;
pub mod errors;
pub mod label;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{DetectionError, ShroudError};
pub use label::EntityLabel;
pub use record::{ColumnRole, Dataset, FieldValue, Record};
pub use result::Result;

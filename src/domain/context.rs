//! Error context extension trait
//!
//! Adds `.context()` and `.with_context()` to any `Result` whose error
//! converts into [`ShroudError`]. Unlike `anyhow::Context`, the variant is
//! kept: a dataset error stays a dataset error, with the context prepended to
//! its message.
//!
//! # Examples
//!
//! ```rust
//! use shroud::domain::Result;
//! use shroud::domain::context::ResultExt;
//!
//! fn read_header(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_context(|| format!("Failed to read dataset {path}"))
//! }
//! ```

use crate::domain::errors::ShroudError;
use crate::domain::result::Result;
use std::fmt::Display;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display;

    /// Add context computed only when an error occurs
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ShroudError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display,
    {
        self.map_err(|e| prefixed(e.into(), &context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| prefixed(e.into(), &f()))
    }
}

fn prefixed(error: ShroudError, context: &dyn Display) -> ShroudError {
    let wrap = |message: String| format!("{context}: {message}");
    match error {
        ShroudError::Configuration(m) => ShroudError::Configuration(wrap(m)),
        ShroudError::Vault(m) => ShroudError::Vault(wrap(m)),
        ShroudError::Generalization(m) => ShroudError::Generalization(wrap(m)),
        ShroudError::Dataset(m) => ShroudError::Dataset(wrap(m)),
        ShroudError::Validation(m) => ShroudError::Validation(wrap(m)),
        ShroudError::Serialization(m) => ShroudError::Serialization(wrap(m)),
        ShroudError::Io(m) => ShroudError::Io(wrap(m)),
        other @ (ShroudError::Detection(_) | ShroudError::Cancelled) => other,
    }
}

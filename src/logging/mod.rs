//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - console output on stderr
//! - optional JSON file logs with rotation
//! - helper macros for pipeline stages
//!
//! Raw identifiers never reach a log line. Stage macros take counts and
//! durations only; errors are rendered through their `Display` impl, which
//! carries no record content.
//!
//! # Example
//!
//! ```no_run
//! use shroud::logging::init_logging;
//! use shroud::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use shroud::log_stage_start;
///
/// log_stage_start!("pseudonymize", 1200);
/// ```
#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $records:expr) => {
        tracing::info!(stage = $stage, records = $records, "Stage started");
    };
}

/// Log the completion of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use shroud::log_stage_complete;
/// use std::time::Duration;
///
/// log_stage_complete!("enforce", 1180, Duration::from_millis(35));
/// ```
#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $records:expr, $duration:expr) => {
        tracing::info!(
            stage = $stage,
            records = $records,
            duration_ms = $duration.as_millis(),
            "Stage completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use shroud::log_error_with_context;
/// use shroud::domain::ShroudError;
///
/// let error = ShroudError::Configuration("k must be at least 1".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::ShroudError;
    use std::time::Duration;

    #[test]
    fn test_macros_expand_without_subscriber() {
        log_stage_start!("pseudonymize", 3);
        log_stage_complete!("pseudonymize", 3, Duration::from_millis(5));
        log_error_with_context!(&ShroudError::Cancelled, "test");
    }
}

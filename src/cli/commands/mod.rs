//! CLI command implementations
//!
//! Commands return process exit codes:
//! - `0` success
//! - `2` configuration error
//! - `5` fatal error
//! - `130` interrupted by a signal

pub mod init;
pub mod process;
pub mod validate;

/// Successful run
pub const EXIT_SUCCESS: i32 = 0;
/// Invalid or missing configuration
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// Run aborted by an error
pub const EXIT_FATAL: i32 = 5;
/// Run aborted by SIGINT/SIGTERM
pub const EXIT_INTERRUPTED: i32 = 130;

//! Audit logging module
//!
//! JSON-lines (or plain text) audit trail of pipeline runs. Identifier values
//! appear only as salted SHA-256 digests.

pub mod logger;

pub use logger::{AuditLogger, FieldAudit, RecordAudit};

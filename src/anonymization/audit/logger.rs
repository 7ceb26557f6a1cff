//! Audit logger for pipeline runs

use crate::anonymization::config::AuditConfig;
use crate::anonymization::kanonymity::ColumnLevel;
use crate::anonymization::pseudonymizer::Replacement;
use crate::anonymization::report::RunReport;
use crate::domain::EntityLabel;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use uuid::Uuid;

/// Replacements made in one free-text field of one record
#[derive(Debug, Clone)]
pub struct FieldAudit {
    /// Column name
    pub column: String,
    /// Replacements in the field
    pub replacements: Vec<Replacement>,
}

/// Replacements made in one record
#[derive(Debug, Clone)]
pub struct RecordAudit {
    /// Input row index
    pub row: usize,
    /// Fields with at least one replacement
    pub fields: Vec<FieldAudit>,
}

/// Audit log entry
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum AuditLogEntry<'a> {
    RunCompleted {
        run_id: Uuid,
        timestamp: String,
        dry_run: bool,
        k: usize,
        records_in: usize,
        records_out: usize,
        suppressed: usize,
        replacements_by_label: &'a BTreeMap<EntityLabel, usize>,
        vault_entries: &'a BTreeMap<EntityLabel, usize>,
        levels: &'a [ColumnLevel],
        rounds: usize,
        smallest_class_size: usize,
    },
    RunFailed {
        run_id: Uuid,
        timestamp: String,
        error: String,
    },
    RecordDetections {
        run_id: Uuid,
        row: usize,
        detections: Vec<AuditDetection<'a>>,
    },
}

/// Audit detection entry (with hashed value)
#[derive(Debug, Serialize)]
struct AuditDetection<'a> {
    column: &'a str,
    label: &'a str,
    start: usize,
    end: usize,
    /// SHA-256 hash of original value (never log plaintext identifiers)
    value_hash: &'a str,
}

/// Audit logger for pipeline runs
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
    record_details: bool,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
            record_details: false,
        })
    }

    /// Create a logger from the `[audit]` section
    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        let mut logger = Self::new(config.log_path.clone(), config.json_format, config.enabled)?;
        logger.record_details = config.record_details;
        Ok(logger)
    }

    /// Whether per-record entries are wanted
    pub fn wants_record_details(&self) -> bool {
        self.enabled && self.record_details
    }

    /// Log a finished run
    pub fn log_run(&self, report: &RunReport) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry::RunCompleted {
            run_id: report.run_id,
            timestamp: Utc::now().to_rfc3339(),
            dry_run: report.dry_run,
            k: report.k,
            records_in: report.records_in,
            records_out: report.records_out,
            suppressed: report.suppressed,
            replacements_by_label: &report.replacements_by_label,
            vault_entries: &report.vault_entries,
            levels: &report.levels,
            rounds: report.rounds,
            smallest_class_size: report.smallest_class_size,
        };

        self.write_entries(std::iter::once(entry))
    }

    /// Log an aborted run
    pub fn log_failure(&self, run_id: Uuid, error: &dyn std::fmt::Display) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry::RunFailed {
            run_id,
            timestamp: Utc::now().to_rfc3339(),
            error: error.to_string(),
        };
        self.write_entries(std::iter::once(entry))
    }

    /// Log per-record detections, one entry per record
    pub fn log_records(&self, run_id: Uuid, records: &[RecordAudit]) -> Result<()> {
        if !self.wants_record_details() || records.is_empty() {
            return Ok(());
        }

        let entries = records.iter().map(|record| AuditLogEntry::RecordDetections {
            run_id,
            row: record.row,
            detections: record
                .fields
                .iter()
                .flat_map(|field| {
                    field.replacements.iter().map(move |r| AuditDetection {
                        column: &field.column,
                        label: r.label.as_str(),
                        start: r.start,
                        end: r.end,
                        value_hash: &r.value_hash,
                    })
                })
                .collect(),
        });

        self.write_entries(entries)
    }

    /// Append entries to the log file
    fn write_entries<'a>(&self, entries: impl Iterator<Item = AuditLogEntry<'a>>) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;
        let mut writer = BufWriter::new(file);

        for entry in entries {
            if self.json_format {
                let json_line =
                    serde_json::to_string(&entry).context("Failed to serialize audit entry")?;
                writeln!(writer, "{json_line}").context("Failed to write audit entry")?;
            } else {
                writeln!(writer, "{}", plain_text(&entry))
                    .context("Failed to write audit entry")?;
            }
        }

        writer.flush().context("Failed to flush audit log")?;
        Ok(())
    }
}

fn plain_text(entry: &AuditLogEntry<'_>) -> String {
    match entry {
        AuditLogEntry::RunCompleted {
            run_id,
            timestamp,
            records_in,
            records_out,
            suppressed,
            replacements_by_label,
            k,
            ..
        } => format!(
            "[{timestamp}] Run: {run_id} | k: {k} | In: {records_in} | Out: {records_out} | Suppressed: {suppressed} | Replacements: {}",
            replacements_by_label.values().sum::<usize>()
        ),
        AuditLogEntry::RunFailed {
            run_id,
            timestamp,
            error,
        } => format!("[{timestamp}] Run: {run_id} | FAILED | {error}"),
        AuditLogEntry::RecordDetections {
            run_id,
            row,
            detections,
        } => format!(
            "Run: {run_id} | Row: {row} | Detections: {}",
            detections.len()
        ),
    }
}

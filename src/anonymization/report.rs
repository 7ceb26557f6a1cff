//! Run reporting
//!
//! A [`RunReport`] summarizes one pipeline run: counts, replacements per
//! label, vault size, final generalization levels and class statistics.
//! It never carries raw identifiers.

use crate::anonymization::kanonymity::ColumnLevel;
use crate::domain::EntityLabel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Wall-clock time per stage
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageDurations {
    /// Reading the input
    pub load_ms: u64,
    /// Detection and pseudonymization
    pub pseudonymize_ms: u64,
    /// Generalization and k-anonymity enforcement
    pub enforce_ms: u64,
    /// Writing the output
    pub write_ms: u64,
    /// Whole run
    pub total_ms: u64,
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run identifier, shared with the audit log
    pub run_id: Uuid,

    /// Run start time
    pub started_at: DateTime<Utc>,

    /// Output was not written
    pub dry_run: bool,

    /// Input file
    pub input_path: String,

    /// Output file; `None` for dry runs
    pub output_path: Option<String>,

    /// Target k
    pub k: usize,

    /// Rows read
    pub records_in: usize,

    /// Rows emitted
    pub records_out: usize,

    /// Rows removed by suppression
    pub suppressed: usize,

    /// Free-text fields that had at least one replacement
    pub fields_pseudonymized: usize,

    /// Span replacements per label
    pub replacements_by_label: BTreeMap<EntityLabel, usize>,

    /// Distinct identifiers per label held by the vault
    pub vault_entries: BTreeMap<EntityLabel, usize>,

    /// Configured columns absent from the input
    pub skipped_columns: Vec<String>,

    /// Final generalization level per quasi-identifier column
    pub levels: Vec<ColumnLevel>,

    /// Escalation rounds performed
    pub rounds: usize,

    /// Equivalence classes in the output
    pub equivalence_classes: usize,

    /// Smallest equivalence class in the output
    pub smallest_class_size: usize,

    /// Stage timings
    pub durations: StageDurations,

    /// Non-fatal findings
    pub warnings: Vec<String>,
}

impl RunReport {
    /// Create an empty report for a new run
    pub fn new(input_path: impl Into<String>, k: usize, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            dry_run,
            input_path: input_path.into(),
            output_path: None,
            k,
            records_in: 0,
            records_out: 0,
            suppressed: 0,
            fields_pseudonymized: 0,
            replacements_by_label: BTreeMap::new(),
            vault_entries: BTreeMap::new(),
            skipped_columns: Vec::new(),
            levels: Vec::new(),
            rounds: 0,
            equivalence_classes: 0,
            smallest_class_size: 0,
            durations: StageDurations::default(),
            warnings: Vec::new(),
        }
    }

    /// Merge per-label replacement counts
    pub fn add_replacements(&mut self, counts: &BTreeMap<EntityLabel, usize>) {
        for (label, count) in counts {
            *self.replacements_by_label.entry(label.clone()).or_insert(0) += count;
        }
    }

    /// Total span replacements
    pub fn total_replacements(&self) -> usize {
        self.replacements_by_label.values().sum()
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();
        let rule = "───────────────────────────────────────────────────────────────\n";
        let banner = "═══════════════════════════════════════════════════════════════\n";
        let title = if self.dry_run {
            "                    SHROUD DRY-RUN REPORT                      \n"
        } else {
            "                      SHROUD RUN REPORT                        \n"
        };

        output.push('\n');
        output.push_str(banner);
        output.push_str(title);
        output.push_str(banner);
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str(rule);
        output.push_str(&format!("  Run ID:                {}\n", self.run_id));
        output.push_str(&format!("  Input:                 {}\n", self.input_path));
        match &self.output_path {
            Some(path) => output.push_str(&format!("  Output:                {path}\n")),
            None => output.push_str("  Output:                (not written)\n"),
        }
        output.push_str(&format!("  Records In:            {}\n", self.records_in));
        output.push_str(&format!("  Records Out:           {}\n", self.records_out));
        output.push_str(&format!("  Records Suppressed:    {}\n", self.suppressed));
        output.push_str(&format!(
            "  Total Time:            {} ms\n",
            self.durations.total_ms
        ));
        output.push('\n');

        output.push_str("🔍 PSEUDONYMIZATION\n");
        output.push_str(rule);
        output.push_str(&format!(
            "  Fields Rewritten:      {}\n",
            self.fields_pseudonymized
        ));
        output.push_str(&format!(
            "  Total Replacements:    {}\n",
            self.total_replacements()
        ));
        for (label, count) in &self.replacements_by_label {
            let distinct = self.vault_entries.get(label).copied().unwrap_or(0);
            output.push_str(&format!(
                "  {:22} {:>6}  ({} distinct)\n",
                label.as_str(),
                count,
                distinct
            ));
        }
        output.push('\n');

        output.push_str("🧮 K-ANONYMITY\n");
        output.push_str(rule);
        output.push_str(&format!("  Target k:              {}\n", self.k));
        output.push_str(&format!("  Escalation Rounds:     {}\n", self.rounds));
        output.push_str(&format!(
            "  Equivalence Classes:   {}\n",
            self.equivalence_classes
        ));
        output.push_str(&format!(
            "  Smallest Class:        {}\n",
            self.smallest_class_size
        ));
        for level in &self.levels {
            output.push_str(&format!(
                "  {:22} level {} of {}\n",
                level.column, level.level, level.max_level
            ));
        }
        output.push('\n');

        if !self.skipped_columns.is_empty() || !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str(rule);
            for column in &self.skipped_columns {
                output.push_str(&format!("  • Column '{column}' not found in input, skipped\n"));
            }
            for warning in &self.warnings {
                output.push_str(&format!("  • {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str(banner);
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> EntityLabel {
        EntityLabel::new(s).unwrap()
    }

    #[test]
    fn test_report_creation() {
        let report = RunReport::new("in.csv", 5, true);
        assert_eq!(report.k, 5);
        assert!(report.dry_run);
        assert_eq!(report.total_replacements(), 0);
        assert!(report.output_path.is_none());
    }

    #[test]
    fn test_add_replacements_accumulates() {
        let mut report = RunReport::new("in.csv", 2, false);
        let counts: BTreeMap<_, _> = [(label("PERSON"), 2), (label("EMAIL"), 1)].into();
        report.add_replacements(&counts);
        report.add_replacements(&counts);

        assert_eq!(report.replacements_by_label.get(&label("PERSON")), Some(&4));
        assert_eq!(report.total_replacements(), 6);
    }

    #[test]
    fn test_format_console() {
        let mut report = RunReport::new("customers.csv", 5, false);
        report.output_path = Some("customers_private.csv".to_string());
        report.records_in = 10;
        report.records_out = 8;
        report.suppressed = 2;
        report.skipped_columns.push("phone".to_string());
        report.levels.push(ColumnLevel {
            column: "age".to_string(),
            level: 1,
            max_level: 2,
        });

        let output = report.format_console();
        assert!(output.contains("SHROUD RUN REPORT"));
        assert!(output.contains("Records In:            10"));
        assert!(output.contains("Records Suppressed:    2"));
        assert!(output.contains("level 1 of 2"));
        assert!(output.contains("Column 'phone' not found"));
    }

    #[test]
    fn test_format_json() {
        let report = RunReport::new("in.csv", 3, true);
        let json = report.format_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["k"], 3);
        assert_eq!(value["dry_run"], true);
    }
}

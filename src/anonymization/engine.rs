//! Pipeline orchestrator
//!
//! [`PrivacyEngine`] runs one dataset through the privacy pipeline:
//!
//! 1. **Load**: read the CSV input
//! 2. **Pseudonymize**: detect and replace direct identifiers in free-text
//!    columns, one record per blocking task on a bounded, order-preserving
//!    stream
//! 3. **Enforce**: generalize quasi-identifiers and enforce k-anonymity over
//!    the whole dataset
//! 4. **Write**: emit the surviving records atomically (skipped on dry runs)
//!
//! Every run gets a fresh [`IdentifierVault`]; nothing maps identifiers
//! across runs except the salted hashes.
//!
//! # Examples
//!
//! ```no_run
//! use shroud::anonymization::PrivacyEngine;
//! use shroud::config::load_config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config("shroud.toml")?;
//! let engine = PrivacyEngine::new(config)?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let report = engine.run(shutdown_rx).await?;
//! println!("{}", report.format_console());
//! # Ok(())
//! # }
//! ```

use crate::anonymization::{
    audit::{AuditLogger, FieldAudit, RecordAudit},
    detector::{
        lexicon::LexiconDetector, patterns::PatternRegistry, regex::RegexDetector,
        CompositeDetector, EntityDetector,
    },
    generalizer::Generalizer,
    kanonymity::{EnforcementOutcome, KAnonymityVerifier},
    pseudonymizer::Pseudonymizer,
    report::RunReport,
    vault::IdentifierVault,
};
use crate::config::ShroudConfig;
use crate::dataset::{read_dataset, write_dataset};
use crate::domain::{EntityLabel, FieldValue, Record, Result, ShroudError};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Result of pseudonymizing one record
struct PseudonymizedRecord {
    record: Record,
    audit: RecordAudit,
    counts: BTreeMap<EntityLabel, usize>,
}

/// Privacy pipeline orchestrator
///
/// Holds the run-independent parts of the pipeline (detector, generalization
/// rules, audit logger) and creates a new vault for every [`run`](Self::run).
pub struct PrivacyEngine {
    config: ShroudConfig,
    detector: Arc<dyn EntityDetector>,
    generalizer: Arc<Generalizer>,
    audit_logger: AuditLogger,
}

impl PrivacyEngine {
    /// Create an engine with the configured rule-based detectors
    ///
    /// The regex detector uses the pattern library from `[detector]` (or the
    /// built-in one). When a lexicon is configured, a lexicon detector runs
    /// alongside it.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern library or lexicon cannot be compiled,
    /// the generalization rules are invalid, or the audit log directory cannot
    /// be created.
    pub fn new(config: ShroudConfig) -> Result<Self> {
        let detector = build_detector(&config)?;
        Self::with_detector(config, detector)
    }

    /// Create an engine around an explicit detector
    pub fn with_detector(config: ShroudConfig, detector: Arc<dyn EntityDetector>) -> Result<Self> {
        let generalizer = Generalizer::new(config.anonymization.rules.clone())?;
        // Fail at construction rather than mid-run
        KAnonymityVerifier::new(&generalizer, config.anonymization.k)?;

        let audit_logger = AuditLogger::from_config(&config.audit)
            .map_err(|e| ShroudError::Configuration(format!("{e:#}")))?;

        tracing::debug!(
            detector = detector.name(),
            k = config.anonymization.k,
            workers = config.processing.workers,
            "Privacy engine initialized"
        );

        Ok(Self {
            config,
            detector,
            generalizer: Arc::new(generalizer),
            audit_logger,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &ShroudConfig {
        &self.config
    }

    /// Run the pipeline over the configured input
    ///
    /// On success the output file has been written (unless the run is a dry
    /// run) and the report describes what happened. On any error, including
    /// cancellation through `shutdown`, no output is written and the failure
    /// is recorded in the audit log.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<RunReport> {
        let dry_run = self.config.application.dry_run;
        let mut report = RunReport::new(
            self.config.dataset.input_path.display().to_string(),
            self.config.anonymization.k,
            dry_run,
        );
        let run_id = report.run_id;

        tracing::info!(
            run_id = %run_id,
            input = %self.config.dataset.input_path.display(),
            k = self.config.anonymization.k,
            dry_run,
            "Starting privacy run"
        );

        match self.execute(&mut report, shutdown).await {
            Ok(()) => {
                if let Err(e) = self.audit_logger.log_run(&report) {
                    tracing::warn!(error = %e, "Failed to write audit entry");
                }
                tracing::info!(
                    run_id = %run_id,
                    records_in = report.records_in,
                    records_out = report.records_out,
                    suppressed = report.suppressed,
                    replacements = report.total_replacements(),
                    duration_ms = report.durations.total_ms,
                    "Privacy run completed"
                );
                Ok(report)
            }
            Err(e) => {
                crate::log_error_with_context!(&e, "Privacy run failed");
                if let Err(audit_err) = self.audit_logger.log_failure(run_id, &e) {
                    tracing::warn!(error = %audit_err, "Failed to write audit entry");
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        report: &mut RunReport,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let run_start = Instant::now();

        // Load
        let stage_start = Instant::now();
        let input_path = self.config.dataset.input_path.clone();
        let delimiter = self.config.dataset.delimiter_byte();
        let dataset = tokio::task::spawn_blocking(move || read_dataset(&input_path, delimiter))
            .await
            .map_err(join_error)??;
        report.records_in = dataset.len();
        report.durations.load_ms = elapsed_ms(stage_start);
        crate::log_stage_complete!("load", dataset.len(), stage_start.elapsed());

        let free_text_columns = self.present_columns(
            self.config.free_text_columns(),
            dataset.columns(),
            report,
        );
        let quasi_columns =
            self.present_columns(self.config.quasi_columns(), dataset.columns(), report);
        let (columns, records) = dataset.into_parts();

        check_shutdown(&shutdown)?;

        // Pseudonymize
        let stage_start = Instant::now();
        crate::log_stage_start!("pseudonymize", records.len());
        let vault = Arc::new(IdentifierVault::new(
            self.config.pseudonymization.salt.clone(),
            self.config.pseudonymization.vault_settings(),
        )?);
        let pseudonymizer = Arc::new(Pseudonymizer::new(Arc::clone(&self.detector), vault));
        let records = self
            .pseudonymize_all(records, &pseudonymizer, free_text_columns, report, &shutdown)
            .await?;
        report.vault_entries = pseudonymizer.vault().stats();
        report.durations.pseudonymize_ms = elapsed_ms(stage_start);
        crate::log_stage_complete!("pseudonymize", records.len(), stage_start.elapsed());

        // Enforce
        let stage_start = Instant::now();
        crate::log_stage_start!("enforce", records.len());
        let outcome = self.enforce(records, quasi_columns, shutdown.clone()).await?;
        report.records_out = outcome.accepted.len();
        report.suppressed = outcome.suppressed.len();
        report.levels = outcome.levels;
        report.rounds = outcome.rounds;
        report.equivalence_classes = outcome.check.equivalence_classes;
        report.smallest_class_size = outcome.check.smallest_class_size;
        if report.suppressed > 0 {
            report.add_warning(format!(
                "{} record(s) suppressed to reach k = {}",
                report.suppressed, report.k
            ));
        }
        report.durations.enforce_ms = elapsed_ms(stage_start);
        crate::log_stage_complete!("enforce", report.records_out, stage_start.elapsed());

        check_shutdown(&shutdown)?;

        // Write
        if report.dry_run {
            tracing::info!("Dry run, output not written");
        } else {
            let stage_start = Instant::now();
            let output_path = self.config.dataset.output_path.clone();
            report.output_path = Some(output_path.display().to_string());
            write_output(output_path, delimiter, columns, outcome.accepted).await?;
            report.durations.write_ms = elapsed_ms(stage_start);
            crate::log_stage_complete!("write", report.records_out, stage_start.elapsed());
        }

        report.durations.total_ms = elapsed_ms(run_start);
        Ok(())
    }

    /// Keep configured columns present in the header; warn about the rest
    fn present_columns(
        &self,
        configured: Vec<String>,
        header: &[String],
        report: &mut RunReport,
    ) -> Vec<String> {
        let (present, missing): (Vec<_>, Vec<_>) = configured
            .into_iter()
            .partition(|column| header.contains(column));
        for column in missing {
            tracing::warn!(column = %column, "Configured column not found in input, skipping");
            report.skipped_columns.push(column);
        }
        present
    }

    async fn pseudonymize_all(
        &self,
        records: Vec<Record>,
        pseudonymizer: &Arc<Pseudonymizer>,
        free_text_columns: Vec<String>,
        report: &mut RunReport,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<Vec<Record>> {
        let columns = Arc::new(free_text_columns);
        let labels = Arc::new(self.config.pseudonymization.protected_labels.clone());
        let keep_audit = self.audit_logger.wants_record_details();
        let workers = self.config.processing.workers.max(1);
        let total = records.len();

        let mut tasks = stream::iter(records)
            .map(|record| {
                let pseudonymizer = Arc::clone(pseudonymizer);
                let columns = Arc::clone(&columns);
                let labels = Arc::clone(&labels);
                tokio::task::spawn_blocking(move || {
                    pseudonymize_record(&pseudonymizer, record, &columns, &labels)
                })
            })
            .buffered(workers);

        let mut output = Vec::with_capacity(total);
        let mut audits = Vec::new();
        while let Some(joined) = tasks.next().await {
            check_shutdown(shutdown)?;
            let processed = joined.map_err(join_error)??;

            report.add_replacements(&processed.counts);
            report.fields_pseudonymized += processed.audit.fields.len();
            if keep_audit && !processed.audit.fields.is_empty() {
                audits.push(processed.audit);
            }
            output.push(processed.record);

            if output.len() % 1000 == 0 {
                tracing::debug!(processed = output.len(), total, "Pseudonymization progress");
            }
        }

        if let Err(e) = self.audit_logger.log_records(report.run_id, &audits) {
            tracing::warn!(error = %e, "Failed to write per-record audit entries");
        }
        Ok(output)
    }

    async fn enforce(
        &self,
        records: Vec<Record>,
        quasi_columns: Vec<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<EnforcementOutcome> {
        let generalizer = Arc::clone(&self.generalizer);
        let k = self.config.anonymization.k;
        tokio::task::spawn_blocking(move || {
            let verifier = KAnonymityVerifier::new(&generalizer, k)?;
            verifier.enforce(records, &quasi_columns, Some(&shutdown))
        })
        .await
        .map_err(join_error)?
    }
}

/// Build the detector described by `[detector]`
fn build_detector(config: &ShroudConfig) -> Result<Arc<dyn EntityDetector>> {
    let registry = match &config.detector.pattern_library {
        Some(path) => PatternRegistry::from_file(path)?,
        None => PatternRegistry::default_patterns()?,
    };
    let mut regex = RegexDetector::with_registry(registry);
    if let Some(threshold) = config.detector.confidence_threshold {
        regex = regex.with_confidence_threshold(threshold as f32);
    }

    if config.detector.lexicon.is_empty() {
        return Ok(Arc::new(regex));
    }

    let lexicon = LexiconDetector::new(&config.detector.lexicon)?;
    tracing::debug!(labels = lexicon.label_count(), "Lexicon detector enabled");
    Ok(Arc::new(CompositeDetector::new(vec![
        Arc::new(lexicon),
        Arc::new(regex),
    ])))
}

/// Pseudonymize every free-text field of one record
fn pseudonymize_record(
    pseudonymizer: &Pseudonymizer,
    mut record: Record,
    columns: &[String],
    labels: &BTreeSet<EntityLabel>,
) -> Result<PseudonymizedRecord> {
    let mut audit = RecordAudit {
        row: record.row,
        fields: Vec::new(),
    };
    let mut counts: BTreeMap<EntityLabel, usize> = BTreeMap::new();

    for column in columns {
        let Some(text) = record.get(column).and_then(FieldValue::as_text) else {
            continue;
        };
        let field = pseudonymizer.pseudonymize(text, labels)?;
        if !field.is_modified() {
            continue;
        }

        for (label, count) in field.counts_by_label() {
            *counts.entry(label).or_insert(0) += count;
        }
        record.set(column.clone(), FieldValue::Text(field.text));
        audit.fields.push(FieldAudit {
            column: column.clone(),
            replacements: field.replacements,
        });
    }

    Ok(PseudonymizedRecord {
        record,
        audit,
        counts,
    })
}

async fn write_output(
    path: PathBuf,
    delimiter: u8,
    columns: Vec<String>,
    records: Vec<Record>,
) -> Result<()> {
    tokio::task::spawn_blocking(move || write_dataset(&path, delimiter, &columns, &records))
        .await
        .map_err(join_error)?
}

fn check_shutdown(shutdown: &watch::Receiver<bool>) -> Result<()> {
    if *shutdown.borrow() {
        tracing::warn!("Shutdown requested, aborting run before output");
        return Err(ShroudError::Cancelled);
    }
    Ok(())
}

fn join_error(err: tokio::task::JoinError) -> ShroudError {
    ShroudError::Io(format!("Worker task failed: {err}"))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

//! Free-text pseudonymization
//!
//! Rewrites a field by splicing vault replacements into the exact byte ranges
//! the detector reported, right to left. Splicing from the highest offset
//! down keeps every not-yet-processed offset valid, and because no substring
//! search is involved, an identifier's literal text elsewhere in the field
//! (inside another word, or inside an earlier replacement) is never touched.

use crate::anonymization::detector::EntityDetector;
use crate::anonymization::models::EntitySpan;
use crate::anonymization::vault::IdentifierVault;
use crate::domain::{DetectionError, EntityLabel, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One replaced span, described without its plaintext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Entity label
    pub label: EntityLabel,
    /// Start offset in the original text
    pub start: usize,
    /// End offset in the original text
    pub end: usize,
    /// Salted SHA-256 of the normalized span text, for audit
    pub value_hash: String,
}

/// Result of pseudonymizing one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudonymizedField {
    /// Rewritten text
    pub text: String,
    /// Replacements in original-text order
    pub replacements: Vec<Replacement>,
}

impl PseudonymizedField {
    /// Check whether anything was replaced
    pub fn is_modified(&self) -> bool {
        !self.replacements.is_empty()
    }

    /// Replacement count per label
    pub fn counts_by_label(&self) -> BTreeMap<EntityLabel, usize> {
        let mut counts = BTreeMap::new();
        for replacement in &self.replacements {
            *counts.entry(replacement.label.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Replaces detected identifiers with vault pseudonyms
pub struct Pseudonymizer {
    detector: Arc<dyn EntityDetector>,
    vault: Arc<IdentifierVault>,
}

impl Pseudonymizer {
    /// Create a pseudonymizer over a detector and a run's vault
    pub fn new(detector: Arc<dyn EntityDetector>, vault: Arc<IdentifierVault>) -> Self {
        Self { detector, vault }
    }

    /// The run's vault
    pub fn vault(&self) -> &Arc<IdentifierVault> {
        &self.vault
    }

    /// Pseudonymize one field
    ///
    /// A field without protected entities comes back unchanged.
    ///
    /// # Errors
    ///
    /// Detector failures and spans that break the detector contract
    /// (out of bounds, off a char boundary, overlapping, text mismatch) are
    /// returned as errors; the caller must abort the run.
    pub fn pseudonymize(
        &self,
        field_text: &str,
        protected_labels: &BTreeSet<EntityLabel>,
    ) -> Result<PseudonymizedField> {
        if protected_labels.is_empty() || field_text.is_empty() {
            return Ok(unchanged(field_text));
        }

        let mut spans: Vec<EntitySpan> = self
            .detector
            .detect(field_text, protected_labels)?
            .into_iter()
            .filter(|span| protected_labels.contains(&span.label))
            .collect();

        if spans.is_empty() {
            return Ok(unchanged(field_text));
        }

        spans.sort_by(|a, b| b.start.cmp(&a.start));
        validate_spans(field_text, &spans)?;

        let mut text = field_text.to_string();
        let mut replacements = Vec::with_capacity(spans.len());

        for span in &spans {
            let replacement = self.vault.resolve(&span.text, &span.label)?;
            text.replace_range(span.start..span.end, &replacement);
            replacements.push(Replacement {
                label: span.label.clone(),
                start: span.start,
                end: span.end,
                value_hash: self.vault.fingerprint(&span.text),
            });
        }

        replacements.reverse();
        Ok(PseudonymizedField { text, replacements })
    }
}

fn unchanged(field_text: &str) -> PseudonymizedField {
    PseudonymizedField {
        text: field_text.to_string(),
        replacements: Vec::new(),
    }
}

/// Validate spans sorted by start descending
fn validate_spans(source: &str, spans: &[EntitySpan]) -> std::result::Result<(), DetectionError> {
    let mut right_edge = source.len();
    for span in spans {
        span.check_bounds(source)?;

        if span.end > right_edge {
            return Err(DetectionError::InvalidSpan {
                start: span.start,
                end: span.end,
                len: source.len(),
                reason: "span overlaps another detected span".to_string(),
            });
        }
        if source[span.start..span.end] != span.text {
            return Err(DetectionError::InvalidSpan {
                start: span.start,
                end: span.end,
                len: source.len(),
                reason: "span text does not match the field at its offsets".to_string(),
            });
        }
        right_edge = span.start;
    }
    Ok(())
}

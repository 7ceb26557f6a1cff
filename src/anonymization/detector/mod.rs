//! Entity detection module
//!
//! Provides the trait-based detection interface consumed by the pseudonymizer,
//! plus two rule-based implementations: a regex pattern detector and an
//! exact-term lexicon detector. Any other detector (statistical, learned) can
//! be plugged in by implementing [`EntityDetector`].

pub mod lexicon;
pub mod patterns;
pub mod regex;

use crate::anonymization::models::EntitySpan;
use crate::domain::{DetectionError, EntityLabel};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Trait for entity detector implementations
///
/// Implementations return spans sorted by `start` ascending and
/// non-overlapping, restricted to `labels` (an empty set means every label
/// the detector knows). Detection is treated as a blocking call.
pub trait EntityDetector: Send + Sync {
    /// Detect entities in one field's text
    fn detect(
        &self,
        text: &str,
        labels: &BTreeSet<EntityLabel>,
    ) -> Result<Vec<EntitySpan>, DetectionError>;

    /// Short name used in logs and reports
    fn name(&self) -> &str;
}

/// Runs several detectors over the same text and merges their spans
pub struct CompositeDetector {
    detectors: Vec<Arc<dyn EntityDetector>>,
}

impl CompositeDetector {
    /// Create a composite from detectors in priority order
    pub fn new(detectors: Vec<Arc<dyn EntityDetector>>) -> Self {
        Self { detectors }
    }
}

impl EntityDetector for CompositeDetector {
    fn detect(
        &self,
        text: &str,
        labels: &BTreeSet<EntityLabel>,
    ) -> Result<Vec<EntitySpan>, DetectionError> {
        let mut spans = Vec::new();
        for detector in &self.detectors {
            spans.extend(detector.detect(text, labels)?);
        }
        Ok(resolve_overlaps(spans))
    }

    fn name(&self) -> &str {
        "composite"
    }
}

/// Sort candidate spans and drop overlaps
///
/// Earlier spans win; at equal start the longer span wins. The result is
/// ascending by `start` and non-overlapping.
pub fn resolve_overlaps(mut spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<EntitySpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match kept.last() {
            Some(last) if last.overlaps(&span) => continue,
            _ => kept.push(span),
        }
    }
    kept
}

/// Check whether `label` is requested by `labels` (empty means all)
pub(crate) fn is_requested(labels: &BTreeSet<EntityLabel>, label: &EntityLabel) -> bool {
    labels.is_empty() || labels.contains(label)
}

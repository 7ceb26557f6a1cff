//! Lexicon (gazetteer) entity detector
//!
//! Matches a fixed list of known terms per label, case-insensitively and on
//! word boundaries. Useful for names the regex library cannot recognise, such
//! as a customer list exported alongside the dataset.

use super::{is_requested, resolve_overlaps, EntityDetector};
use crate::anonymization::models::EntitySpan;
use crate::domain::{DetectionError, EntityLabel};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

struct LexiconEntry {
    label: EntityLabel,
    regex: Regex,
}

/// Exact-term detector
pub struct LexiconDetector {
    entries: Vec<LexiconEntry>,
}

impl LexiconDetector {
    /// Build a detector from `label -> terms`
    ///
    /// Blank terms are ignored. Longer terms are tried first so
    /// `John Smith` wins over `John`.
    pub fn new(terms: &BTreeMap<EntityLabel, Vec<String>>) -> Result<Self, DetectionError> {
        let mut entries = Vec::with_capacity(terms.len());

        for (label, words) in terms {
            let mut words: Vec<&str> = words
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .collect();
            if words.is_empty() {
                continue;
            }
            words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            words.dedup();

            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).map_err(|e| {
                DetectionError::Unavailable(format!("Failed to compile lexicon for {label}: {e}"))
            })?;

            entries.push(LexiconEntry {
                label: label.clone(),
                regex,
            });
        }

        Ok(Self { entries })
    }

    /// Number of labels with at least one term
    pub fn label_count(&self) -> usize {
        self.entries.len()
    }
}

impl EntityDetector for LexiconDetector {
    fn detect(
        &self,
        text: &str,
        labels: &BTreeSet<EntityLabel>,
    ) -> Result<Vec<EntitySpan>, DetectionError> {
        let mut spans = Vec::new();
        for entry in &self.entries {
            if !is_requested(labels, &entry.label) {
                continue;
            }
            for matched in entry.regex.find_iter(text) {
                spans.push(EntitySpan::new(
                    matched.start(),
                    matched.end(),
                    entry.label.clone(),
                    matched.as_str(),
                ));
            }
        }
        Ok(resolve_overlaps(spans))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(terms: &[(&str, &[&str])]) -> LexiconDetector {
        let map = terms
            .iter()
            .map(|(label, words)| {
                (
                    EntityLabel::new(label).unwrap(),
                    words.iter().map(|w| w.to_string()).collect(),
                )
            })
            .collect();
        LexiconDetector::new(&map).unwrap()
    }

    #[test]
    fn test_longest_term_wins() {
        let detector = detector(&[("PERSON", &["John", "John Smith"])]);
        let spans = detector
            .detect("Contact John Smith today", &BTreeSet::new())
            .unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "John Smith");
    }

    #[test]
    fn test_word_boundaries_respected() {
        let detector = detector(&[("PERSON", &["John"])]);
        let spans = detector
            .detect("Johnson met John", &BTreeSet::new())
            .unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 12);
    }

    #[test]
    fn test_case_insensitive() {
        let detector = detector(&[("PERSON", &["john smith"])]);
        let spans = detector.detect("JOHN SMITH called", &BTreeSet::new()).unwrap();
        assert_eq!(spans[0].text, "JOHN SMITH");
    }

    #[test]
    fn test_blank_terms_ignored() {
        let detector = detector(&[("PERSON", &["  ", ""])]);
        assert_eq!(detector.label_count(), 0);
    }
}

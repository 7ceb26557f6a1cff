//! Regex-based entity detector

use super::{is_requested, patterns::PatternRegistry, resolve_overlaps, EntityDetector};
use super::patterns::ENTITY_GROUP;
use crate::anonymization::models::EntitySpan;
use crate::domain::{DetectionError, EntityLabel};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Regex-based entity detector
pub struct RegexDetector {
    pattern_registry: Arc<PatternRegistry>,
    confidence_threshold: f32,
}

impl RegexDetector {
    /// Create a new regex detector with default patterns
    pub fn new() -> Result<Self, DetectionError> {
        let registry = PatternRegistry::default_patterns()?;
        Ok(Self::with_registry(registry))
    }

    /// Create a new regex detector with custom pattern registry
    pub fn with_registry(registry: PatternRegistry) -> Self {
        Self {
            pattern_registry: Arc::new(registry),
            confidence_threshold: 0.7,
        }
    }

    /// Set the confidence threshold
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Get the confidence threshold
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

impl EntityDetector for RegexDetector {
    fn detect(
        &self,
        text: &str,
        labels: &BTreeSet<EntityLabel>,
    ) -> Result<Vec<EntitySpan>, DetectionError> {
        let mut spans = Vec::new();

        for pattern in self.pattern_registry.all_patterns() {
            if pattern.confidence < self.confidence_threshold
                || !is_requested(labels, &pattern.label)
            {
                continue;
            }

            for capture in pattern.regex.captures_iter(text) {
                let matched = capture.name(ENTITY_GROUP).or_else(|| capture.get(0));
                if let Some(matched) = matched {
                    if matched.start() == matched.end() {
                        continue;
                    }
                    spans.push(EntitySpan::new(
                        matched.start(),
                        matched.end(),
                        pattern.label.clone(),
                        matched.as_str(),
                    ));
                }
            }
        }

        Ok(resolve_overlaps(spans))
    }

    fn name(&self) -> &str {
        "regex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> BTreeSet<EntityLabel> {
        BTreeSet::new()
    }

    fn only(label: &str) -> BTreeSet<EntityLabel> {
        [EntityLabel::new(label).unwrap()].into_iter().collect()
    }

    #[test]
    fn test_detect_email() {
        let detector = RegexDetector::new().unwrap();
        let text = "Contact: john.doe@example.com";
        let spans = detector.detect(text, &all()).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label.as_str(), "EMAIL");
        assert_eq!(&text[spans[0].start..spans[0].end], "john.doe@example.com");
    }

    #[test]
    fn test_detect_phone() {
        let detector = RegexDetector::new().unwrap();
        let spans = detector.detect("Call (555) 123-4567", &all()).unwrap();

        assert!(spans.iter().any(|s| s.label.as_str() == "PHONE"));
    }

    #[test]
    fn test_titled_person_reports_name_only() {
        let detector = RegexDetector::new().unwrap();
        let text = "Seen by Dr. Jane Smith today";
        let spans = detector.detect(text, &only("PERSON")).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Jane Smith");
        assert_eq!(&text[spans[0].start..spans[0].end], "Jane Smith");
    }

    #[test]
    fn test_bare_name_field_detected() {
        let detector = RegexDetector::new().unwrap();
        for name in ["John Smith", "  Sean O'Brien ", "José Álvarez-Ruiz"] {
            let spans = detector.detect(name, &only("PERSON")).unwrap();

            assert_eq!(spans.len(), 1, "{name}");
            assert_eq!(spans[0].text, name.trim());
        }
    }

    #[test]
    fn test_capitalized_name_in_text_detected() {
        let detector = RegexDetector::new().unwrap();
        let text = "met Bo Chan and Ann Lee yesterday";
        let spans = detector.detect(text, &only("PERSON")).unwrap();

        let names: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(names, ["Bo Chan", "Ann Lee"]);
    }

    #[test]
    fn test_lowercase_text_has_no_names() {
        let detector = RegexDetector::new().unwrap();
        let spans = detector
            .detect("called back, no answer", &only("PERSON"))
            .unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn test_label_filter() {
        let detector = RegexDetector::new().unwrap();
        let text = "mail a@b.com or call 555-123-4567";
        let spans = detector.detect(text, &only("PHONE")).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label.as_str(), "PHONE");
    }

    #[test]
    fn test_spans_sorted_and_disjoint() {
        let detector = RegexDetector::new().unwrap();
        let text = "x@y.org, 555-123-4567, z@w.net, 12 Baker Street";
        let spans = detector.detect(text, &all()).unwrap();

        assert_eq!(spans.len(), 4);
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_confidence_threshold_filters_patterns() {
        let detector = RegexDetector::new()
            .unwrap()
            .with_confidence_threshold(0.9);
        let spans = detector
            .detect("a@b.com 555-123-4567", &all())
            .unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label.as_str(), "EMAIL");
    }
}

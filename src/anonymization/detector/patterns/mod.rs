//! Pattern library for entity detection

use crate::domain::{DetectionError, EntityLabel};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Name of the optional capture group that narrows a match to the entity itself
///
/// `(?:Mr|Dr)\.?\s+(?P<entity>[A-Z][a-z]+)` reports only the name, not the title.
pub const ENTITY_GROUP: &str = "entity";

/// Pattern definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct PatternDefinition {
    /// Regex patterns for this entry
    pub patterns: Vec<String>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    /// Entity label emitted on match
    pub label: EntityLabel,
}

/// Compiled pattern with metadata
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Library entry name
    pub name: String,
    /// Compiled regex
    pub regex: Regex,
    /// Entity label
    pub label: EntityLabel,
    /// Confidence score
    pub confidence: f32,
}

/// Pattern library container
#[derive(Debug, Deserialize)]
struct PatternLibrary {
    patterns: BTreeMap<String, PatternDefinition>,
}

/// Pattern registry for entity detection
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
    patterns_by_label: HashMap<EntityLabel, Vec<CompiledPattern>>,
}

impl PatternRegistry {
    /// Create a new pattern registry from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DetectionError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DetectionError::PatternLibrary(format!(
                "Failed to read pattern library {}: {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Create a pattern registry from TOML content
    ///
    /// Entries are compiled in name order so detection output is stable.
    pub fn from_toml(content: &str) -> Result<Self, DetectionError> {
        let library: PatternLibrary = toml::from_str(content).map_err(|e| {
            DetectionError::PatternLibrary(format!("Failed to parse pattern library TOML: {e}"))
        })?;

        let mut patterns = Vec::new();
        let mut patterns_by_label: HashMap<EntityLabel, Vec<CompiledPattern>> = HashMap::new();

        for (name, def) in library.patterns {
            if !(0.0..=1.0).contains(&def.confidence) {
                return Err(DetectionError::PatternLibrary(format!(
                    "Confidence for pattern '{name}' must be between 0.0 and 1.0, got {}",
                    def.confidence
                )));
            }

            for pattern_str in &def.patterns {
                let regex = Regex::new(pattern_str).map_err(|e| {
                    DetectionError::PatternLibrary(format!(
                        "Invalid regex in pattern '{name}': {pattern_str}: {e}"
                    ))
                })?;

                let compiled = CompiledPattern {
                    name: name.clone(),
                    regex,
                    label: def.label.clone(),
                    confidence: def.confidence,
                };

                patterns.push(compiled.clone());
                patterns_by_label
                    .entry(def.label.clone())
                    .or_default()
                    .push(compiled);
            }
        }

        Ok(Self {
            patterns,
            patterns_by_label,
        })
    }

    /// Create a default pattern registry with built-in patterns
    pub fn default_patterns() -> Result<Self, DetectionError> {
        let default_toml = include_str!("../../../../patterns/entity_patterns.toml");
        Self::from_toml(default_toml)
    }

    /// Get all patterns
    pub fn all_patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// Get patterns for a specific label
    pub fn patterns_for_label(&self, label: &EntityLabel) -> Option<&[CompiledPattern]> {
        self.patterns_by_label.get(label).map(|v| v.as_slice())
    }

    /// Labels this registry can emit
    pub fn labels(&self) -> Vec<&EntityLabel> {
        let mut labels: Vec<&EntityLabel> = self.patterns_by_label.keys().collect();
        labels.sort();
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> EntityLabel {
        EntityLabel::new(s).unwrap()
    }

    #[test]
    fn test_load_default_patterns() {
        let registry = PatternRegistry::default_patterns().unwrap();
        assert!(!registry.all_patterns().is_empty());
        assert!(registry.labels().contains(&&label("EMAIL")));
    }

    #[test]
    fn test_email_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let email_patterns = registry.patterns_for_label(&label("EMAIL")).unwrap();

        let pattern = &email_patterns[0];
        assert!(pattern.regex.is_match("test@example.com"));
        assert!(!pattern.regex.is_match("not-an-email"));
    }

    #[test]
    fn test_phone_pattern() {
        let registry = PatternRegistry::default_patterns().unwrap();
        let phone_patterns = registry.patterns_for_label(&label("PHONE")).unwrap();

        let text = "Call me at (555) 123-4567";
        assert!(phone_patterns.iter().any(|p| p.regex.is_match(text)));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let toml = r#"
[patterns.broken]
label = "PERSON"
confidence = 0.9
patterns = ["(unclosed"]
"#;
        assert!(matches!(
            PatternRegistry::from_toml(toml),
            Err(DetectionError::PatternLibrary(_))
        ));
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let toml = r#"
[patterns.too_sure]
label = "PERSON"
confidence = 1.5
patterns = ["x"]
"#;
        assert!(PatternRegistry::from_toml(toml).is_err());
    }
}

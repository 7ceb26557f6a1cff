//! Quasi-identifier generalization
//!
//! Each quasi-identifier column owns an ordered list of levels. Level 0 is the
//! most specific generalization and the last level is the coarsest. Every
//! transform is a pure function of the raw value, and each level maps its own
//! output onto itself, so re-applying a level never changes a value further.
//!
//! Levels are configured in TOML as tagged tables:
//!
//! ```toml
//! [[anonymization.rules]]
//! column = "age"
//! levels = [
//!     { transform = "bins", edges = [0, 18, 30, 40, 50, 60] },
//!     { transform = "range", width = 20, cap = 60 },
//!     { transform = "suppress" },
//! ]
//! ```

use crate::domain::{FieldValue, Record, Result, ShroudError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Value emitted for suppressed, null, or unparseable inputs
pub const SUPPRESSION_TOKEN: &str = "*";

fn default_mask() -> char {
    'X'
}

fn default_token() -> String {
    SUPPRESSION_TOKEN.to_string()
}

/// One generalization level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transform", rename_all = "snake_case")]
pub enum GeneralizationLevel {
    /// Right-open numeric intervals; the last interval is open-ended
    Bins {
        /// Ascending interval edges
        edges: Vec<f64>,
        /// One label per interval, including the open-ended last one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        labels: Option<Vec<String>>,
    },
    /// Fixed-width numeric buckets
    Range {
        /// Bucket width
        width: f64,
        /// Values at or above the cap collapse into `cap+`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cap: Option<f64>,
    },
    /// Keep a prefix and mask the remainder
    Prefix {
        /// Characters kept
        keep: usize,
        /// Mask character for the remainder
        #[serde(default = "default_mask")]
        mask: char,
        /// Fixed output length; without it the output keeps the input's length
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<usize>,
    },
    /// Replace every value with a constant
    Suppress {
        /// Replacement constant
        #[serde(default = "default_token")]
        token: String,
    },
}

impl GeneralizationLevel {
    /// Check the level's parameters
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            GeneralizationLevel::Bins { edges, labels } => {
                if edges.is_empty() {
                    return Err("bins need at least one edge".to_string());
                }
                if edges.iter().any(|e| !e.is_finite()) {
                    return Err("bin edges must be finite numbers".to_string());
                }
                if edges.windows(2).any(|w| w[0] >= w[1]) {
                    return Err("bin edges must be strictly ascending".to_string());
                }
                if let Some(labels) = labels {
                    if labels.len() != edges.len() {
                        return Err(format!(
                            "{} bin edges need {} labels, got {}",
                            edges.len(),
                            edges.len(),
                            labels.len()
                        ));
                    }
                }
                Ok(())
            }
            GeneralizationLevel::Range { width, cap } => {
                if !width.is_finite() || *width <= 0.0 {
                    return Err(format!("range width must be positive, got {width}"));
                }
                if let Some(cap) = cap {
                    if !cap.is_finite() {
                        return Err("range cap must be a finite number".to_string());
                    }
                }
                Ok(())
            }
            GeneralizationLevel::Prefix { keep, width, .. } => match width {
                Some(width) if width < keep => Err(format!(
                    "prefix width {width} is shorter than the {keep} characters kept"
                )),
                _ => Ok(()),
            },
            GeneralizationLevel::Suppress { token } => {
                if token.is_empty() {
                    Err("suppression token cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Apply the level to a raw value
    pub fn apply(&self, value: &FieldValue) -> String {
        if let GeneralizationLevel::Suppress { token } = self {
            return token.clone();
        }
        if value.is_null() {
            return SUPPRESSION_TOKEN.to_string();
        }

        match self {
            GeneralizationLevel::Bins { edges, labels } => match value.as_number() {
                Some(n) => bin_label(edges, labels.as_deref(), n),
                None => self.keep_own_output(value),
            },
            GeneralizationLevel::Range { width, cap } => match value.as_number() {
                Some(n) => range_label(*width, *cap, n),
                None => self.keep_own_output(value),
            },
            GeneralizationLevel::Prefix { keep, mask, width } => {
                let text = value.to_string();
                let kept: String = text.chars().take(*keep).collect();
                let length = width.unwrap_or_else(|| text.chars().count());
                let masked = length.saturating_sub(kept.chars().count());
                format!("{kept}{}", mask.to_string().repeat(masked))
            }
            GeneralizationLevel::Suppress { token } => token.clone(),
        }
    }

    /// Non-numeric input to a numeric level: keep this level's own labels,
    /// suppress anything else
    fn keep_own_output(&self, value: &FieldValue) -> String {
        let text = value.to_string();
        if self.is_own_output(&text) {
            text
        } else {
            SUPPRESSION_TOKEN.to_string()
        }
    }

    fn is_own_output(&self, text: &str) -> bool {
        match self {
            GeneralizationLevel::Bins {
                labels: Some(labels),
                ..
            } => labels.iter().any(|label| label == text),
            GeneralizationLevel::Bins { edges, labels: None } => {
                (0..edges.len()).any(|i| default_bin_label(edges, i) == text)
            }
            GeneralizationLevel::Range { width, cap } => leading_bound(text)
                .map(|lo| range_label(*width, *cap, lo) == text)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Lower bound of an `lo-hi` or `lo+` label
fn leading_bound(text: &str) -> Option<f64> {
    if let Some(lo) = text.strip_suffix('+') {
        return lo.parse().ok();
    }
    let split = text.char_indices().skip(1).find(|(_, c)| *c == '-')?.0;
    text[..split].parse().ok()
}

fn bin_label(edges: &[f64], labels: Option<&[String]>, n: f64) -> String {
    let Some(first) = edges.first() else {
        return SUPPRESSION_TOKEN.to_string();
    };
    if n < *first {
        return SUPPRESSION_TOKEN.to_string();
    }
    let index = edges.iter().rposition(|edge| n >= *edge).unwrap_or(0);
    match labels {
        Some(labels) => labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| SUPPRESSION_TOKEN.to_string()),
        None => default_bin_label(edges, index),
    }
}

fn default_bin_label(edges: &[f64], index: usize) -> String {
    let lo = edges[index];
    match edges.get(index + 1) {
        Some(hi) => interval_label(lo, *hi),
        None => format!("{}+", format_bound(lo)),
    }
}

fn range_label(width: f64, cap: Option<f64>, n: f64) -> String {
    if let Some(cap) = cap {
        if n >= cap {
            return format!("{}+", format_bound(cap));
        }
    }
    let lo = (n / width).floor() * width;
    interval_label(lo, lo + width)
}

/// Label for `[lo, hi)`; integral bounds render as inclusive `lo-(hi-1)`
fn interval_label(lo: f64, hi: f64) -> String {
    if lo.fract() == 0.0 && hi.fract() == 0.0 {
        format!("{}-{}", format_bound(lo), format_bound(hi - 1.0))
    } else {
        format!("{}-{}", format_bound(lo), format_bound(hi))
    }
}

fn format_bound(n: f64) -> String {
    FieldValue::Number(n).to_string()
}

/// Generalization levels for one quasi-identifier column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralizationRule {
    /// Column name
    pub column: String,
    /// Levels, most specific first
    pub levels: Vec<GeneralizationLevel>,
}

impl GeneralizationRule {
    /// Create a rule
    pub fn new(column: impl Into<String>, levels: Vec<GeneralizationLevel>) -> Self {
        Self {
            column: column.into(),
            levels,
        }
    }

    /// Highest level index
    pub fn max_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }
}

/// Default rule table: `age` and `zip`
pub fn default_rules() -> Vec<GeneralizationRule> {
    vec![
        GeneralizationRule::new(
            "age",
            vec![
                GeneralizationLevel::Bins {
                    edges: vec![0.0, 18.0, 30.0, 40.0, 50.0, 60.0],
                    labels: None,
                },
                GeneralizationLevel::Range {
                    width: 20.0,
                    cap: Some(60.0),
                },
                GeneralizationLevel::Suppress {
                    token: default_token(),
                },
            ],
        ),
        GeneralizationRule::new(
            "zip",
            vec![
                GeneralizationLevel::Prefix {
                    keep: 3,
                    mask: 'X',
                    width: Some(5),
                },
                GeneralizationLevel::Prefix {
                    keep: 2,
                    mask: 'X',
                    width: Some(5),
                },
                GeneralizationLevel::Suppress {
                    token: default_token(),
                },
            ],
        ),
    ]
}

/// Applies the rule table to records
#[derive(Debug, Clone)]
pub struct Generalizer {
    rules: Vec<GeneralizationRule>,
}

impl Generalizer {
    /// Create a generalizer from rules in declared escalation order
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a rule without levels, a duplicate
    /// column, or an invalid level.
    pub fn new(rules: Vec<GeneralizationRule>) -> Result<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.column.trim().is_empty() {
                return Err(ShroudError::Configuration(
                    "Generalization rule has an empty column name".to_string(),
                ));
            }
            if !seen.insert(rule.column.as_str()) {
                return Err(ShroudError::Configuration(format!(
                    "Duplicate generalization rule for column '{}'",
                    rule.column
                )));
            }
            if rule.levels.is_empty() {
                return Err(ShroudError::Configuration(format!(
                    "Generalization rule for column '{}' needs at least one level",
                    rule.column
                )));
            }
            for (index, level) in rule.levels.iter().enumerate() {
                level.validate().map_err(|e| {
                    ShroudError::Configuration(format!(
                        "Column '{}' level {index}: {e}",
                        rule.column
                    ))
                })?;
            }
        }
        Ok(Self { rules })
    }

    /// Rules in declared order
    pub fn rules(&self) -> &[GeneralizationRule] {
        &self.rules
    }

    /// Rule for a column
    pub fn rule(&self, column: &str) -> Option<&GeneralizationRule> {
        self.rules.iter().find(|rule| rule.column == column)
    }

    /// Highest level for a column
    pub fn max_level(&self, column: &str) -> Option<usize> {
        self.rule(column).map(GeneralizationRule::max_level)
    }

    /// Generalize one column of a record at `level`
    ///
    /// A column missing from the record generalizes like a null value.
    pub fn generalize(&self, record: &Record, column: &str, level: usize) -> Result<FieldValue> {
        let rule = self.rule(column).ok_or_else(|| {
            ShroudError::Generalization(format!("No generalization rule for column '{column}'"))
        })?;
        let transform = rule.levels.get(level).ok_or_else(|| {
            ShroudError::Generalization(format!(
                "Column '{column}' has no level {level} (max {})",
                rule.max_level()
            ))
        })?;

        let raw = record.get(column).cloned().unwrap_or_default();
        Ok(FieldValue::Text(transform.apply(&raw)))
    }
}

impl Default for Generalizer {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

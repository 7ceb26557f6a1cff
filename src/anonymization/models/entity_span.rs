//! Entity span data model

use crate::domain::{DetectionError, EntityLabel};
use serde::{Deserialize, Serialize};

/// A labelled region of one field's text, as reported by an entity detector
///
/// Offsets are byte offsets into the UTF-8 text, half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
    /// Entity label
    pub label: EntityLabel,
    /// The covered text, `text[start..end]`
    pub text: String,
}

impl EntitySpan {
    /// Create a span
    pub fn new(start: usize, end: usize, label: EntityLabel, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label,
            text: text.into(),
        }
    }

    /// Create a span by slicing `source`, which must contain `[start, end)`
    pub fn from_source(
        source: &str,
        start: usize,
        end: usize,
        label: EntityLabel,
    ) -> Result<Self, DetectionError> {
        let span = Self::new(start, end, label, String::new());
        span.check_bounds(source)?;
        Ok(Self {
            text: source[start..end].to_string(),
            ..span
        })
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span covers nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if two spans share at least one byte
    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Verify the span addresses a non-empty region on char boundaries of `source`
    pub fn check_bounds(&self, source: &str) -> Result<(), DetectionError> {
        let invalid = |reason: &str| DetectionError::InvalidSpan {
            start: self.start,
            end: self.end,
            len: source.len(),
            reason: reason.to_string(),
        };

        if self.start >= self.end {
            return Err(invalid("start must be before end"));
        }
        if self.end > source.len() {
            return Err(invalid("end is past the end of the text"));
        }
        if !source.is_char_boundary(self.start) || !source.is_char_boundary(self.end) {
            return Err(invalid("offsets must fall on UTF-8 character boundaries"));
        }
        Ok(())
    }
}

//! Entity label newtype
//!
//! Labels are produced by the entity detector (`PERSON`, `EMAIL`, `PHONE`,
//! `ADDRESS`, ...) and matched against the configured protected label set.
//! They are normalized to upper case on construction so `person` and `PERSON`
//! name the same label.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity label emitted by a detector
///
/// # Examples
///
/// ```
/// use shroud::domain::EntityLabel;
/// use std::str::FromStr;
///
/// let label = EntityLabel::from_str(" email ").unwrap();
/// assert_eq!(label.as_str(), "EMAIL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityLabel(String);

impl EntityLabel {
    /// Well-known label for person names
    pub const PERSON: &'static str = "PERSON";
    /// Well-known label for email addresses
    pub const EMAIL: &'static str = "EMAIL";
    /// Well-known label for phone numbers
    pub const PHONE: &'static str = "PHONE";
    /// Well-known label for postal addresses
    pub const ADDRESS: &'static str = "ADDRESS";

    /// Creates a new label, trimming and upper-casing the input
    pub fn new(label: impl AsRef<str>) -> Result<Self, String> {
        let label = label.as_ref().trim();
        if label.is_empty() {
            return Err("Entity label cannot be empty".to_string());
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(format!(
                "Invalid entity label '{label}': only ASCII letters, digits, '_' and '-' are allowed"
            ));
        }
        Ok(Self(label.to_ascii_uppercase()))
    }

    /// Wrap one of the built-in label constants without re-validating it
    pub(crate) fn known(label: &'static str) -> Self {
        Self(label.to_string())
    }

    /// Returns the label as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EntityLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for EntityLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        EntityLabel::new(raw).map_err(serde::de::Error::custom)
    }
}

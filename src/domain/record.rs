//! Tabular records and datasets
//!
//! A [`Record`] is one row: an ordered mapping from column name to a
//! [`FieldValue`]. Records remember their input row index so the pipeline can
//! emit rows in input order after parallel processing and suppression.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a column in the privacy pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Free text scanned for direct identifiers and pseudonymized
    FreeText,
    /// Quasi-identifier generalized under k-anonymity
    QuasiIdentifier,
    /// Copied to the output unchanged
    Passthrough,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnRole::FreeText => "free_text",
            ColumnRole::QuasiIdentifier => "quasi_identifier",
            ColumnRole::Passthrough => "passthrough",
        };
        write!(f, "{s}")
    }
}

/// Typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    /// Missing value (empty CSV cell)
    #[default]
    Null,
    /// Numeric scalar
    Number(f64),
    /// Text
    Text(String),
}

impl FieldValue {
    /// Build a value from a raw CSV cell; empty cells become [`FieldValue::Null`]
    pub fn from_cell(cell: &str) -> Self {
        if cell.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::Text(cell.to_string())
        }
    }

    /// Check if the value is missing
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Borrow the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a number
    ///
    /// Text values are parsed after trimming; anything unparseable yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

/// One row of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Zero-based position of the row in the input
    pub row: usize,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Create an empty record for input row `row`
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: Vec::new(),
        }
    }

    /// Builder-style setter
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Get a field by column name
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Set a field, replacing the existing value in place or appending a new column
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Iterate fields in column order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A header plus its rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset from a header and rows
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Column names in header order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Check whether the header contains `column`
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Rows in order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split into header and rows
    pub fn into_parts(self) -> (Vec<String>, Vec<Record>) {
        (self.columns, self.records)
    }
}

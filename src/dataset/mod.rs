//! Tabular dataset input and output
//!
//! CSV with a header row. Reading keeps cells as text so values like zip
//! codes with leading zeros survive untouched; numeric interpretation happens
//! in the generalizer.

pub mod csv;

pub use self::csv::{read_dataset, write_dataset};

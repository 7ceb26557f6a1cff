//! Anonymization data models

pub mod entity_span;

pub use entity_span::EntitySpan;

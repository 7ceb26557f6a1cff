//! CSV dataset reader and atomic writer

use crate::domain::context::ResultExt;
use crate::domain::{Dataset, FieldValue, Record, Result, ShroudError};
use ::csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Read a CSV file with a header row
///
/// Empty cells become [`FieldValue::Null`]; everything else is kept as text.
/// Every row must have as many fields as the header.
pub fn read_dataset(path: &Path, delimiter: u8) -> Result<Dataset> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(BufReader::new(file));

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err(ShroudError::Dataset(format!(
            "Dataset {} has no header row",
            path.display()
        )));
    }
    let mut seen = HashSet::new();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(ShroudError::Dataset(format!(
                "Dataset {} has duplicate column '{column}'",
                path.display()
            )));
        }
    }

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let raw = result.with_context(|| format!("Failed to read row {}", row + 1))?;
        let record = columns
            .iter()
            .zip(raw.iter())
            .fold(Record::new(row), |record, (column, cell)| {
                record.with(column.as_str(), FieldValue::from_cell(cell))
            });
        records.push(record);
    }

    tracing::debug!(
        columns = columns.len(),
        rows = records.len(),
        "Dataset loaded"
    );
    Ok(Dataset::new(columns, records))
}

/// Write records as CSV, replacing `path` atomically
///
/// The data goes to a temporary file in the target directory first and is
/// renamed over `path` only once every row has been written and flushed, so
/// a failure never leaves a partial output file behind.
pub fn write_dataset(
    path: &Path,
    delimiter: u8,
    columns: &[String],
    records: &[Record],
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    {
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(BufWriter::new(temp.as_file_mut()));

        writer.write_record(columns)?;
        for record in records {
            writer.write_record(columns.iter().map(|column| {
                record
                    .get(column)
                    .map(ToString::to_string)
                    .unwrap_or_default()
            }))?;
        }
        writer.flush()?;
        let mut inner = writer
            .into_inner()
            .map_err(|e| ShroudError::Io(format!("Failed to flush output: {}", e.error())))?;
        inner.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| {
        ShroudError::Io(format!(
            "Failed to move output into place at {}: {}",
            path.display(),
            e.error
        ))
    })?;

    tracing::debug!(rows = records.len(), path = %path.display(), "Dataset written");
    Ok(())
}

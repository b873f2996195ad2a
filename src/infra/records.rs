//! CSV record adapter.
//!
//! Collaborator surface for the CLI: reads rows into [`Record`]s with the
//! designated question column extracted, and writes the kept subsequence
//! back out with the original header and field order untouched. The core
//! pipeline itself is format-agnostic.

use std::path::Path;

use tracing::info;

use crate::core::pipeline::Record;
use crate::error::{QsiftError, Result};

/// A loaded CSV: headers plus records in file order
#[derive(Debug)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// Read `path`, extracting `column` as the deduplication target. A
/// missing column is an input-validation error surfaced before any stage
/// runs; rows short on fields yield an empty text value rather than a
/// per-row fault.
pub fn read_csv(path: &Path, column: &str) -> Result<CsvTable> {
    if !path.exists() {
        return Err(QsiftError::InputValidation(format!(
            "input file not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let column_idx = headers.iter().position(|h| h == column).ok_or_else(|| {
        QsiftError::InputValidation(format!(
            "column '{column}' not found in input; available columns: {}",
            headers.join(", ")
        ))
    })?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let fields: Vec<String> = row.iter().map(str::to_string).collect();
        let text = fields.get(column_idx).cloned().unwrap_or_default();
        records.push(Record { text, fields });
    }

    info!(rows = records.len(), path = %path.display(), "loaded input");
    Ok(CsvTable { headers, records })
}

/// Write `records` under `headers` to `path`, creating parent
/// directories as needed
pub fn write_csv(path: &Path, headers: &[String], records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(&record.fields)?;
    }
    writer.flush()?;

    info!(rows = records.len(), path = %path.display(), "wrote output");
    Ok(())
}

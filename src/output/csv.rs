//! CSV output for collected entities
//!
//! Entities are free-form field maps, so the column set is the union of all
//! fields in first-seen order. Cells missing from an entity are left empty.

use csv::{Reader, Writer};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{EntityWriter, OutputError, OutputResult, OutputWriter};
use crate::Entity;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// How an existing output file is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate and write a fresh file
    Overwrite,
    /// Add rows to the end; the header is only written to a new or empty file
    Append,
}

/// Columns covering every field of `entities`, in first-seen order
pub fn columns_of(entities: &[Entity]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for entity in entities {
        for (field, _) in entity.fields() {
            if !columns.iter().any(|c| c == field) {
                columns.push(field.clone());
            }
        }
    }
    columns
}

/// Render a JSON value as a CSV cell
fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// CSV writer with a fixed column set
pub struct CsvEntityWriter {
    writer: Writer<BufWriter<File>>,
    columns: Vec<String>,
    rows_written: u64,
}

impl CsvEntityWriter {
    /// Open `path` for writing `columns`.
    ///
    /// Appending to a non-empty file keeps its header layout: rows follow the
    /// existing column order and columns the file lacks are added by
    /// rewriting it with a widened header.
    pub fn create<P: AsRef<Path>>(path: P, columns: Vec<String>, mode: WriteMode) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={} mode={:?}", path.display(), mode);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let existing = match mode {
            WriteMode::Append => existing_header(path)?,
            WriteMode::Overwrite => None,
        };

        let columns = match &existing {
            Some(header) => {
                let missing: Vec<String> = columns
                    .into_iter()
                    .filter(|c| !header.contains(c))
                    .collect();
                if !missing.is_empty() {
                    widen_file(path, header, &missing)?;
                }
                header.iter().cloned().chain(missing).collect()
            }
            None => columns,
        };

        let file = match mode {
            WriteMode::Overwrite => File::create(path),
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
        }
        .map_err(|e| OutputError::IoError(format!("Failed to open file: {}", e)))?;

        let mut writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        if existing.is_some() {
            debug!("Appending to existing file, header skipped");
        } else {
            writer
                .write_record(&columns)
                .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;
        }

        Ok(Self {
            writer,
            columns,
            rows_written: 0,
        })
    }

    /// Get number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl EntityWriter for CsvEntityWriter {
    fn write_entity(&mut self, entity: &Entity) -> OutputResult<()> {
        let row = self.columns.iter().map(|c| render_cell(entity.get(c)));

        self.writer
            .write_record(row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;

        self.rows_written += 1;
        Ok(())
    }
}

impl OutputWriter for CsvEntityWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;

        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!("CSV writer closed successfully: {} rows written", self.rows_written);
        Ok(())
    }
}

/// Header of a non-empty CSV file, `None` for a missing or empty file
fn existing_header(path: &Path) -> OutputResult<Option<Vec<String>>> {
    let has_content = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if !has_content {
        return Ok(None);
    }

    let mut reader = Reader::from_path(path)
        .map_err(|e| OutputError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    let header = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header: {}", e)))?;
    Ok(Some(header.iter().map(str::to_string).collect()))
}

/// Rewrite `path` with `missing` appended to its header; existing rows get
/// empty cells for the new columns
fn widen_file(path: &Path, header: &[String], missing: &[String]) -> OutputResult<()> {
    debug!(
        "Widening {} with columns {}",
        path.display(),
        missing.join(",")
    );

    let mut reader = Reader::from_path(path)
        .map_err(|e| OutputError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| OutputError::CsvError(format!("Failed to read row: {}", e)))?;
    drop(reader);

    let file = File::create(path)
        .map_err(|e| OutputError::IoError(format!("Failed to open file: {}", e)))?;
    let mut writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

    writer
        .write_record(header.iter().chain(missing))
        .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;
    for row in &rows {
        let padded = row
            .iter()
            .chain(std::iter::repeat("").take(missing.len()));
        writer
            .write_record(padded)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
}

/// Write `entities` to `path` in one go; returns the number of rows written
pub fn write_entities<P: AsRef<Path>>(path: P, entities: &[Entity], mode: WriteMode) -> OutputResult<u64> {
    let mut writer = CsvEntityWriter::create(path, columns_of(entities), mode)?;
    writer.write_all(entities)?;
    let rows = writer.rows_written();
    writer.close()?;
    Ok(rows)
}

/// Distinct non-empty values of `column` in `path`, in file order
pub fn read_column<P: AsRef<Path>>(path: P, column: &str) -> OutputResult<Vec<String>> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path)
        .map_err(|e| OutputError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header: {}", e)))?;
    let index = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| OutputError::MissingColumn {
            column: column.to_string(),
            path: path.display().to_string(),
        })?;

    let mut values: Vec<String> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| OutputError::CsvError(format!("Failed to read row: {}", e)))?;
        if let Some(value) = record.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }
    }

    debug!("Read {} distinct '{}' values from {}", values.len(), column, path.display());
    Ok(values)
}

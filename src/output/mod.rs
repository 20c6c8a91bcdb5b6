//! Data output writers

use crate::Entity;

pub mod csv;
pub mod path;

pub use self::csv::{read_column, write_entities, CsvEntityWriter, WriteMode};
pub use path::{run_output_path, run_stamp};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Input file lacks a required column
    #[error("column '{column}' not found in {path}")]
    MissingColumn {
        /// Column that was looked for
        column: String,
        /// File that was read
        path: String,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing collected entities
pub trait EntityWriter: OutputWriter {
    /// Write a single entity
    fn write_entity(&mut self, entity: &Entity) -> OutputResult<()>;

    /// Write multiple entities at once
    fn write_all(&mut self, entities: &[Entity]) -> OutputResult<()> {
        for entity in entities {
            self.write_entity(entity)?;
        }
        Ok(())
    }
}

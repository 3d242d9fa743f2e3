//! Error types for source loading and configuration parsing.

use std::path::PathBuf;

use metab_model::ModelError;
use thiserror::Error;

/// Errors that can occur while loading sheets, datasets or configuration.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// A required input file does not exist.
    #[error("input file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === CSV Parsing Errors ===
    /// The CSV reader rejected the file.
    #[error("failed to parse CSV {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// File is empty.
    #[error("file is empty: {path}")]
    EmptySheet { path: PathBuf },

    // === Schema Errors ===
    /// A positional layout assumption does not hold.
    #[error("{sheet} sheet {path} violates its layout: {reason}")]
    SchemaViolation {
        sheet: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// Required column not found.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A cell that identifies a record could not be interpreted.
    #[error("invalid {field} value '{value}' in {path} (row {row})")]
    InvalidValue {
        field: &'static str,
        value: String,
        path: PathBuf,
        row: usize,
    },

    // === Configuration Errors ===
    /// A configuration line is not a `key = value` assignment.
    #[error("{path}:{line}: {reason}")]
    ConfigSyntax {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A configuration value failed type or range validation.
    #[error("invalid configuration in {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    /// A loaded dataset failed model validation.
    #[error("invalid dataset {path}: {source}")]
    InvalidDataset {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
}

impl IngestError {
    pub(crate) fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::FileRead {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

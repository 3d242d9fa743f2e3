//! Error types for model construction and validation.

use thiserror::Error;

/// Errors raised while building or validating model values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A numeric option fell outside its allowed range.
    #[error("{field} must be within {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },

    /// An option string did not name a known choice.
    #[error("unknown {field} '{value}' (expected one of: {expected})")]
    UnknownChoice {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A metabolite column length disagrees with the dataset row count.
    #[error("column '{column}' has {actual} values but the dataset has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A column name appears more than once.
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A requested phenotype group is not present in the dataset.
    #[error("group '{0}' not found in the phenotype column")]
    GroupNotFound(String),

    /// A grouping definition is incomplete or inconsistent.
    #[error("invalid group definition: {0}")]
    InvalidGroup(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

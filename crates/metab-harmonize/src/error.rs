use std::path::PathBuf;

use metab_model::ModelError;
use thiserror::Error;

/// Errors raised while matching records or assembling the dataset.
#[derive(Debug, Error)]
pub enum HarmonizeError {
    /// A candidate metadata row carries a vial string without digits.
    #[error("metadata row {row} in {path}: vial '{value}' contains no digits")]
    InvalidVial {
        path: PathBuf,
        row: usize,
        value: String,
    },

    /// The assembled rows did not form a consistent dataset.
    #[error("failed to assemble canonical dataset: {0}")]
    Dataset(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;

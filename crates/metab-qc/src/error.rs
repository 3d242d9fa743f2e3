use metab_model::ModelError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the cleaning, filtering and normalization stages.
#[derive(Debug, Error)]
pub enum QcError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The RSD filter is enabled but no pooled QC sheet was supplied.
    #[error("perform_qc is enabled but no qc_file is configured")]
    MissingQcSheet,

    #[error("column statistics failed: {0}")]
    Statistics(#[from] PolarsError),

    #[error("numerical error: {0}")]
    Numerical(String),
}

pub type Result<T> = std::result::Result<T, QcError>;

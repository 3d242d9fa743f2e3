//! Error types for rendering and writing artifacts.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    /// Creating the output directory or writing a file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading an input file for its digest failed.
    #[error("failed to hash {path}: {source}")]
    Digest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building or serialising a dataset frame failed.
    #[error("failed to render dataset {name}: {source}")]
    Frame {
        name: String,
        #[source]
        source: polars::prelude::PolarsError,
    },

    #[error("failed to render report: {0}")]
    Render(#[from] std::fmt::Error),

    #[error("failed to serialise run manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Two artifacts of one run share a file name.
    #[error("artifact {0} was staged twice")]
    DuplicateArtifact(String),
}

pub type Result<T> = std::result::Result<T, OutputError>;

//! Output artifacts of the metabolomics pipeline.
//!
//! - **Datasets**: canonical, cleaned, ranked, normalized and grouped tables,
//!   written as CSV through a polars `DataFrame`
//! - **Reports**: the patient audit, coercion statistics, change log, filter
//!   log and normality summary in their fixed text layouts
//! - **Manifest**: `run_manifest.json` with input digests and stage counts

pub mod artifacts;
mod dataset;
pub mod error;
pub mod manifest;
mod reports;

pub use artifacts::{
    ArtifactSet, CHANGES_LOG, CLEANED_DATA, CLEANUP_STATS, FILTER_LOG, HARMONIZED_DATA,
    NORMALITY_SUMMARY, NORMALIZED_DATA, PATIENTS_SUMMARY, RANKED_DATA, RUN_MANIFEST,
    dataset_file_name, ranked_file_name,
};
pub use dataset::{dataset_frame, render_dataset_csv};
pub use error::{OutputError, Result};
pub use manifest::{
    CleanCounts, FileDigest, FilterCounts, HarmonizeCounts, NormalizeCounts, RunManifest,
    StageCounts, sha256_hex,
};
pub use reports::{
    render_audit_report, render_change_log, render_cleanup_stats, render_filter_log,
    render_normality_summary,
};

//! Data model for the malnutrition metabolomics pipeline.
//!
//! The pipeline reconciles three independently keyed source sheets into one
//! per-patient table and then cleans and normalizes the metabolite values.
//! This crate holds the types every stage shares:
//!
//! - [`ids`]: patient and vial identifiers
//! - [`phenotype`]: phenotype labels and the canonicalization table
//! - [`dataset`]: the canonical flat dataset (metadata + metabolite columns)
//! - [`config`]: typed, range-checked QC and normalizer options
//! - [`changelog`]: append-only record of every cleaning mutation
//! - [`audit`]: outcome of record matching

pub mod audit;
pub mod changelog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ids;
pub mod phenotype;

pub use audit::{AuditReport, CoercionStats};
pub use changelog::ChangeLog;
pub use config::{
    FeatureFilterConfig, GroupDefinition, GroupPair, GroupingConfig, HarmonizeCleanupConfig,
    ImputeMethod, NormalityAction, NormalizerConfig, OutlierMethod, QcConfig,
};
pub use dataset::{CanonicalDataset, ID_COLUMN, MetaboliteColumn, PHENOTYPE_COLUMN, PatientMeta};
pub use error::{ModelError, Result};
pub use ids::{MAX_PATIENT_ID, PatientId, VialId};
pub use phenotype::{Phenotype, canonicalize_phenotype};

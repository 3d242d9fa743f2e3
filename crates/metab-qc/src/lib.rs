//! Quality control over the canonical dataset.
//!
//! - [`cleaning`]: the ordered filter / outlier / imputation pipeline
//! - [`filters`]: RSD, IQR and baseline column filters plus z-scoring
//! - [`normalizer`]: rank and conditional log-transform variants
//! - [`outliers`]: normality-gated capping applied right after assembly
//! - [`grouping`]: phenotype groups and explicit pairwise selection

pub mod cleaning;
pub mod error;
pub mod filters;
pub mod grouping;
pub mod normalizer;
pub mod outliers;
pub mod shapiro;
pub mod stats;

pub use cleaning::{CleaningEngine, CleaningOutcome, CleaningSummary};
pub use error::{QcError, Result};
pub use filters::{FilterEntry, FilterLog, FilterOutcome, apply_feature_filters};
pub use grouping::{GroupedDataset, apply_groups, group_file_stem, pair_file_stem, select_pair};
pub use normalizer::{
    ColumnNormality, DistributionNormalizer, NormalitySummary, NormalizerOutput, log_shift,
    rank_dataset,
};
pub use outliers::clip_normal_columns;
pub use shapiro::{ShapiroWilk, shapiro_wilk};

//! Normality-gated outlier capping for freshly assembled datasets.

use metab_model::{CanonicalDataset, HarmonizeCleanupConfig};
use tracing::{debug, info};

use crate::cleaning::clip_to_bounds;
use crate::error::Result;
use crate::shapiro::shapiro_wilk;
use crate::stats::present;

/// Caps values beyond `mean ± n_sd * sample_std` in columns that pass the
/// normality gate, returning how many values moved.
///
/// Columns too short to test are left alone, as is every column when
/// `clip_outliers` is off.
pub fn clip_normal_columns(
    dataset: &mut CanonicalDataset,
    config: &HarmonizeCleanupConfig,
) -> Result<usize> {
    if !config.clip_outliers {
        return Ok(0);
    }
    let mut corrected = 0;
    for column in dataset.metabolites_mut() {
        let Some(test) = shapiro_wilk(&present(&column.values))? else {
            continue;
        };
        if test.p_value <= config.normality_threshold {
            debug!(column = %column.name, p_value = test.p_value, "not capped");
            continue;
        }
        corrected += clip_to_bounds(column, config.n_sd);
    }
    info!(corrected, n_sd = config.n_sd, "outliers capped");
    Ok(corrected)
}

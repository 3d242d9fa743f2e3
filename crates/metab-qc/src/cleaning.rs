//! Cleaning Engine.
//!
//! Stages run in a fixed order over the metabolite columns:
//!
//! 1. constant-column filter
//! 2. missing-rate filter (columns, then rows of the column-filtered table)
//! 3. zero-rate filter
//! 4. outlier replacement
//! 5. imputation, which always runs and always runs last
//!
//! Rate filters keep a column (or row) only while its count is strictly less
//! than `N * threshold`. Every stage appends one entry to the [`ChangeLog`].

use metab_model::{
    CanonicalDataset, ChangeLog, ImputeMethod, MetaboliteColumn, OutlierMethod, PatientId,
    QcConfig,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::stats::{distinct_count, mean, median, min, population_std, present, sample_std};

/// Per-stage counts of one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub constant_removed: Vec<String>,
    pub missing_removed: Vec<String>,
    pub rows_removed: Vec<PatientId>,
    pub zero_removed: Vec<String>,
    pub outliers_replaced: usize,
    pub values_imputed: usize,
}

#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub dataset: CanonicalDataset,
    pub log: ChangeLog,
    pub summary: CleaningSummary,
}

pub struct CleaningEngine {
    config: QcConfig,
}

impl CleaningEngine {
    pub fn new(config: QcConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    fn record(&self, log: &mut ChangeLog, message: String) {
        if self.config.verbose {
            info!("{message}");
        } else {
            debug!("{message}");
        }
        log.push(message);
    }

    /// Runs every stage over `dataset`; `source` names where it came from.
    pub fn run(&self, mut dataset: CanonicalDataset, source: &str) -> Result<CleaningOutcome> {
        let mut log = ChangeLog::new();
        let mut summary = CleaningSummary {
            rows_before: dataset.row_count(),
            columns_before: dataset.metabolite_count(),
            ..CleaningSummary::default()
        };
        self.record(&mut log, format!("Loaded data from {source}"));

        if self.config.filter_column_constant {
            summary.constant_removed = self.filter_constant_columns(&mut dataset, &mut log)?;
        }
        if let Some(threshold) = self.config.filter_column_missing_rate_threshold {
            summary.missing_removed =
                self.filter_columns_by_missing_rate(&mut dataset, threshold, &mut log);
        }
        if let Some(threshold) = self.config.filter_row_missing_rate_threshold {
            summary.rows_removed =
                self.filter_rows_by_missing_rate(&mut dataset, threshold, &mut log)?;
        }
        if let Some(threshold) = self.config.filter_column_zero_rate_threshold {
            summary.zero_removed = self.filter_columns_by_zero_rate(&mut dataset, threshold, &mut log);
        }
        summary.outliers_replaced = self.replace_outliers(&mut dataset, &mut log);
        summary.values_imputed = self.impute_missing_values(&mut dataset, &mut log);

        summary.rows_after = dataset.row_count();
        summary.columns_after = dataset.metabolite_count();
        self.record(&mut log, "QC pipeline completed".to_string());
        Ok(CleaningOutcome {
            dataset,
            log,
            summary,
        })
    }

    /// Drops columns with at most one distinct present value.
    pub fn filter_constant_columns(
        &self,
        dataset: &mut CanonicalDataset,
        log: &mut ChangeLog,
    ) -> Result<Vec<String>> {
        let mut constant = Vec::new();
        for column in dataset.metabolites() {
            if distinct_count(&present(&column.values))? <= 1 {
                constant.push(column.name.clone());
            }
        }
        let removed = dataset.retain_metabolites(|column| !constant.contains(&column.name));
        self.record(
            log,
            format!("Filtered constant columns: {} columns removed", removed.len()),
        );
        Ok(removed)
    }

    pub fn filter_columns_by_missing_rate(
        &self,
        dataset: &mut CanonicalDataset,
        threshold: f64,
        log: &mut ChangeLog,
    ) -> Vec<String> {
        let rows = dataset.row_count();
        let limit = rows as f64 * threshold;
        // An empty table has no rates to measure.
        let removed = if rows == 0 {
            Vec::new()
        } else {
            dataset.retain_metabolites(|column| (column.missing_count() as f64) < limit)
        };
        self.record(
            log,
            format!(
                "Filtered columns with missing rate above {threshold}: {} columns removed",
                removed.len()
            ),
        );
        removed
    }

    /// Drops whole rows, metadata included, over the remaining columns.
    pub fn filter_rows_by_missing_rate(
        &self,
        dataset: &mut CanonicalDataset,
        threshold: f64,
        log: &mut ChangeLog,
    ) -> Result<Vec<PatientId>> {
        let columns = dataset.metabolite_count();
        let limit = columns as f64 * threshold;
        let removed = if columns == 0 {
            Vec::new()
        } else {
            let mask: Vec<bool> = (0..dataset.row_count())
                .map(|row| {
                    let missing = dataset
                        .metabolites()
                        .iter()
                        .filter(|column| column.values[row].is_none())
                        .count();
                    (missing as f64) < limit
                })
                .collect();
            dataset.retain_rows(&mask)?
        };
        self.record(
            log,
            format!(
                "Filtered rows with missing rate above {threshold}: {} rows removed",
                removed.len()
            ),
        );
        Ok(removed)
    }

    pub fn filter_columns_by_zero_rate(
        &self,
        dataset: &mut CanonicalDataset,
        threshold: f64,
        log: &mut ChangeLog,
    ) -> Vec<String> {
        let rows = dataset.row_count();
        let limit = rows as f64 * threshold;
        let removed = if rows == 0 {
            Vec::new()
        } else {
            dataset.retain_metabolites(|column| (column.zero_count() as f64) < limit)
        };
        self.record(
            log,
            format!(
                "Filtered columns with zero rate above {threshold}: {} columns removed",
                removed.len()
            ),
        );
        removed
    }

    /// Replaces outlying present values according to the configured method.
    ///
    /// `median` replaces values farther than `nSD` population standard
    /// deviations from the median with the median. `clip` caps values at
    /// `mean ± nSD * sample_std`. Missing cells are untouched.
    pub fn replace_outliers(&self, dataset: &mut CanonicalDataset, log: &mut ChangeLog) -> usize {
        let n_sd = self.config.n_sd;
        let replaced = match self.config.replace_outlier_method {
            OutlierMethod::None => return 0,
            OutlierMethod::Median => dataset
                .metabolites_mut()
                .iter_mut()
                .map(|column| replace_with_median(column, n_sd))
                .sum(),
            OutlierMethod::Clip => dataset
                .metabolites_mut()
                .iter_mut()
                .map(|column| clip_to_bounds(column, n_sd))
                .sum(),
        };
        let message = match self.config.replace_outlier_method {
            OutlierMethod::Clip => format!(
                "Clipped outliers to mean ± nSD standard deviations with nSD={n_sd}: {replaced} values changed"
            ),
            _ => format!(
                "Replaced outliers using median method with nSD={n_sd}: {replaced} values changed"
            ),
        };
        self.record(log, message);
        replaced
    }

    /// Fills every missing cell; no column keeps a missing value.
    pub fn impute_missing_values(
        &self,
        dataset: &mut CanonicalDataset,
        log: &mut ChangeLog,
    ) -> usize {
        let method = self.config.impute_method;
        let mut filled = 0;
        let mut empty_columns = Vec::new();
        for column in dataset.metabolites_mut() {
            let values = present(&column.values);
            let fill = match method {
                ImputeMethod::HalfMin => min(&values).map(|m| m / 2.0),
                ImputeMethod::Median => median(&values),
                ImputeMethod::Mean => mean(&values),
                ImputeMethod::Zero => Some(0.0),
            };
            let fill = fill.unwrap_or_else(|| {
                empty_columns.push(column.name.clone());
                0.0
            });
            for value in column.values.iter_mut().filter(|value| value.is_none()) {
                *value = Some(fill);
                filled += 1;
            }
        }
        self.record(
            log,
            format!("Imputed missing values using {method} method: {filled} values filled"),
        );
        if !empty_columns.is_empty() {
            self.record(
                log,
                format!(
                    "Filled {} columns without present values with 0: {}",
                    empty_columns.len(),
                    empty_columns.join(", ")
                ),
            );
        }
        filled
    }
}

fn replace_with_median(column: &mut MetaboliteColumn, n_sd: f64) -> usize {
    let values = present(&column.values);
    let (Some(center), Some(spread)) = (median(&values), population_std(&values)) else {
        return 0;
    };
    let limit = n_sd * spread;
    let mut replaced = 0;
    for value in column.values.iter_mut().flatten() {
        if (*value - center).abs() > limit {
            *value = center;
            replaced += 1;
        }
    }
    replaced
}

pub(crate) fn clip_to_bounds(column: &mut MetaboliteColumn, n_sd: f64) -> usize {
    let values = present(&column.values);
    let (Some(center), Some(spread)) = (mean(&values), sample_std(&values)) else {
        return 0;
    };
    let (lower, upper) = (center - n_sd * spread, center + n_sd * spread);
    let mut clipped = 0;
    for value in column.values.iter_mut().flatten() {
        let bounded = value.clamp(lower, upper);
        if bounded != *value {
            *value = bounded;
            clipped += 1;
        }
    }
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use metab_model::PatientMeta;

    fn dataset(columns: Vec<(&str, Vec<Option<f64>>)>) -> CanonicalDataset {
        let rows = columns.first().map_or(0, |(_, values)| values.len());
        let patients = (0..rows)
            .map(|row| PatientMeta {
                patient_id: PatientId::new(row as u32 + 1),
                descriptors: vec![],
                phenotype: "control".to_string(),
            })
            .collect();
        CanonicalDataset::new(
            vec![],
            patients,
            columns
                .into_iter()
                .map(|(name, values)| MetaboliteColumn::new(name, values))
                .collect(),
        )
        .unwrap()
    }

    fn quiet(config: QcConfig) -> CleaningEngine {
        CleaningEngine::new(QcConfig {
            verbose: false,
            ..config
        })
    }

    #[test]
    fn test_constant_filter_drops_single_valued_and_empty_columns() {
        let mut data = dataset(vec![
            ("flat", vec![Some(1.0), Some(1.0), None]),
            ("empty", vec![None, None, None]),
            ("varied", vec![Some(1.0), Some(2.0), None]),
        ]);
        let mut log = ChangeLog::new();
        let removed = quiet(QcConfig::default())
            .filter_constant_columns(&mut data, &mut log)
            .unwrap();
        assert_eq!(removed, vec!["flat", "empty"]);
        assert_eq!(log.entries(), &["Filtered constant columns: 2 columns removed"]);
    }

    #[test]
    fn test_row_filter_uses_remaining_columns() {
        let mut data = dataset(vec![
            ("a", vec![Some(1.0), None, Some(3.0)]),
            ("b", vec![Some(1.0), None, None]),
        ]);
        let mut log = ChangeLog::new();
        let removed = quiet(QcConfig::default())
            .filter_rows_by_missing_rate(&mut data, 0.5, &mut log)
            .unwrap();
        assert_eq!(removed, vec![PatientId::new(2), PatientId::new(3)]);
        assert_eq!(data.row_count(), 1);
    }

    #[test]
    fn test_zero_rate_filter() {
        let mut data = dataset(vec![
            ("zeros", vec![Some(0.0), Some(0.0), Some(1.0), Some(2.0)]),
            ("few", vec![Some(0.0), Some(1.0), Some(1.0), Some(2.0)]),
        ]);
        let mut log = ChangeLog::new();
        let removed =
            quiet(QcConfig::default()).filter_columns_by_zero_rate(&mut data, 0.25, &mut log);
        assert_eq!(removed, vec!["zeros", "few"]);
        let mut data = dataset(vec![("few", vec![Some(0.0), Some(1.0), Some(1.0), Some(2.0)])]);
        let removed =
            quiet(QcConfig::default()).filter_columns_by_zero_rate(&mut data, 0.5, &mut log);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_clip_caps_at_bounds() {
        let mut column = MetaboliteColumn::new(
            "a",
            vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(50.0)],
        );
        let changed = clip_to_bounds(&mut column, 1.0);
        assert_eq!(changed, 1);
        let capped = column.values[5].unwrap();
        assert!(capped < 50.0 && capped > 1.0);
    }

    #[test]
    fn test_half_min_imputation() {
        let mut data = dataset(vec![("a", vec![Some(4.0), None, Some(2.0)])]);
        let mut log = ChangeLog::new();
        let filled = quiet(QcConfig::default()).impute_missing_values(&mut data, &mut log);
        assert_eq!(filled, 1);
        assert_eq!(data.metabolites()[0].values[1], Some(1.0));
        assert_eq!(
            log.entries(),
            &["Imputed missing values using half-min method: 1 values filled"]
        );
    }

    #[test]
    fn test_column_without_values_filled_with_zero() {
        let mut data = dataset(vec![("a", vec![None, None])]);
        let mut log = ChangeLog::new();
        let engine = quiet(QcConfig {
            impute_method: ImputeMethod::Median,
            ..QcConfig::default()
        });
        engine.impute_missing_values(&mut data, &mut log);
        assert_eq!(data.metabolites()[0].values, vec![Some(0.0), Some(0.0)]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_no_outlier_entry_when_disabled() {
        let mut data = dataset(vec![("a", vec![Some(1.0), Some(100.0)])]);
        let mut log = ChangeLog::new();
        let replaced = quiet(QcConfig::default()).replace_outliers(&mut data, &mut log);
        assert_eq!(replaced, 0);
        assert!(log.is_empty());
    }
}

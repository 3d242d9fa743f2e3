//! Distribution Normalizer.
//!
//! Produces two variants of a cleaned dataset:
//!
//! - **ranked**: every column replaced by its within-column average ranks,
//!   regardless of normality
//! - **normalized**: columns whose Shapiro-Wilk p-value is at or below the
//!   threshold are log-shifted (`ln(1 + v - min)`) and re-tested, or dropped
//!   when the action is [`NormalityAction::Drop`]

use metab_model::{CanonicalDataset, MetaboliteColumn, NormalityAction, NormalizerConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::shapiro::shapiro_wilk;
use crate::stats::{average_ranks, min, present};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnNormality {
    pub name: String,
    pub sample_size: usize,
    /// `None` when the column had too few values to test.
    pub p_value: Option<f64>,
    pub p_value_after: Option<f64>,
    pub transformed: bool,
    pub dropped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalitySummary {
    pub threshold: f64,
    pub action: NormalityAction,
    pub tested: usize,
    pub untested: usize,
    pub failing_before: usize,
    pub failing_after: usize,
    pub columns: Vec<ColumnNormality>,
}

impl NormalitySummary {
    pub fn transformed(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|column| column.transformed)
            .map(|column| column.name.as_str())
    }

    pub fn dropped(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|column| column.dropped)
            .map(|column| column.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct NormalizerOutput {
    pub ranked: CanonicalDataset,
    pub normalized: CanonicalDataset,
    pub summary: NormalitySummary,
}

/// Replaces every column with its average ranks.
pub fn rank_dataset(dataset: &CanonicalDataset) -> Result<CanonicalDataset> {
    let columns = dataset
        .metabolites()
        .iter()
        .map(|column| MetaboliteColumn::new(column.name.clone(), average_ranks(&column.values)))
        .collect();
    Ok(dataset.with_metabolites(columns)?)
}

/// `ln(1 + v - min)`, which maps the column minimum to zero.
pub fn log_shift(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let Some(floor) = min(&present(values)) else {
        return values.to_vec();
    };
    values
        .iter()
        .map(|value| value.map(|v| (v - floor).ln_1p()))
        .collect()
}

pub struct DistributionNormalizer {
    config: NormalizerConfig,
}

impl DistributionNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    fn fails(&self, p_value: Option<f64>) -> bool {
        p_value.is_some_and(|p| p <= self.config.normality_threshold)
    }

    pub fn run(&self, dataset: &CanonicalDataset) -> Result<NormalizerOutput> {
        let ranked = rank_dataset(dataset)?;
        let mut columns = Vec::with_capacity(dataset.metabolite_count());
        let mut reports = Vec::with_capacity(dataset.metabolite_count());

        for column in dataset.metabolites() {
            let values = present(&column.values);
            let p_value = shapiro_wilk(&values)?.map(|result| result.p_value);
            let mut report = ColumnNormality {
                name: column.name.clone(),
                sample_size: values.len(),
                p_value,
                p_value_after: None,
                transformed: false,
                dropped: false,
            };
            if !self.fails(p_value) {
                columns.push(column.clone());
            } else {
                match self.config.action {
                    NormalityAction::Log => {
                        let shifted = log_shift(&column.values);
                        report.p_value_after =
                            shapiro_wilk(&present(&shifted))?.map(|result| result.p_value);
                        report.transformed = true;
                        columns.push(MetaboliteColumn::new(column.name.clone(), shifted));
                    }
                    NormalityAction::Drop => report.dropped = true,
                }
            }
            debug!(
                column = %report.name,
                p_value = ?report.p_value,
                p_value_after = ?report.p_value_after,
                "normality tested"
            );
            reports.push(report);
        }

        let tested = reports.iter().filter(|r| r.p_value.is_some()).count();
        let failing_before = reports.iter().filter(|r| self.fails(r.p_value)).count();
        let failing_after = reports
            .iter()
            .filter(|r| r.transformed && self.fails(r.p_value_after))
            .count();
        let summary = NormalitySummary {
            threshold: self.config.normality_threshold,
            action: self.config.action,
            tested,
            untested: reports.len() - tested,
            failing_before,
            failing_after,
            columns: reports,
        };
        info!(
            tested = summary.tested,
            failing_before = summary.failing_before,
            failing_after = summary.failing_after,
            "normality testing complete"
        );
        Ok(NormalizerOutput {
            ranked,
            normalized: dataset.with_metabolites(columns)?,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metab_model::{PatientId, PatientMeta};

    fn dataset(columns: Vec<(&str, Vec<Option<f64>>)>) -> CanonicalDataset {
        let rows = columns.first().map_or(0, |(_, values)| values.len());
        CanonicalDataset::new(
            vec![],
            (0..rows)
                .map(|row| PatientMeta {
                    patient_id: PatientId::new(row as u32),
                    descriptors: vec![],
                    phenotype: "control".to_string(),
                })
                .collect(),
            columns
                .into_iter()
                .map(|(name, values)| MetaboliteColumn::new(name, values))
                .collect(),
        )
        .unwrap()
    }

    fn skewed() -> Vec<Option<f64>> {
        let mut values = vec![Some(1.0); 15];
        values.extend([Some(2.0), Some(3.0), Some(50.0), Some(120.0), Some(400.0)]);
        values
    }

    fn linear() -> Vec<Option<f64>> {
        (1..=20).map(|v| Some(f64::from(v))).collect()
    }

    #[test]
    fn test_log_shift_maps_min_to_zero() {
        let shifted = log_shift(&[Some(3.0), None, Some(4.0)]);
        assert_eq!(shifted[0], Some(0.0));
        assert_eq!(shifted[1], None);
        assert!((shifted[2].unwrap() - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_ranks_ignore_normality() {
        let data = dataset(vec![("a", vec![Some(5.0), Some(1.0), Some(5.0)])]);
        let output = DistributionNormalizer::new(NormalizerConfig::default())
            .run(&data)
            .unwrap();
        assert_eq!(
            output.ranked.metabolites()[0].values,
            vec![Some(2.5), Some(1.0), Some(2.5)]
        );
    }

    #[test]
    fn test_non_normal_column_is_transformed() {
        let data = dataset(vec![("skewed", skewed()), ("linear", linear())]);
        let output = DistributionNormalizer::new(NormalizerConfig::default())
            .run(&data)
            .unwrap();
        assert_eq!(output.summary.failing_before, 1);
        assert_eq!(output.summary.transformed().collect::<Vec<_>>(), vec!["skewed"]);
        assert_eq!(output.normalized.metabolite_count(), 2);
        assert_eq!(output.normalized.metabolites()[0].values[0], Some(0.0));
        assert_eq!(output.normalized.metabolites()[1], data.metabolites()[1]);
    }

    #[test]
    fn test_drop_action_removes_column() {
        let data = dataset(vec![("skewed", skewed()), ("linear", linear())]);
        let config = NormalizerConfig {
            action: NormalityAction::Drop,
            ..NormalizerConfig::default()
        };
        let output = DistributionNormalizer::new(config).run(&data).unwrap();
        assert_eq!(output.normalized.metabolite_names(), vec!["linear"]);
        assert_eq!(output.summary.dropped().collect::<Vec<_>>(), vec!["skewed"]);
        assert_eq!(output.ranked.metabolite_count(), 2);
    }

    #[test]
    fn test_short_columns_are_not_tested() {
        let data = dataset(vec![("a", vec![Some(1.0), None])]);
        let output = DistributionNormalizer::new(NormalizerConfig::default())
            .run(&data)
            .unwrap();
        assert_eq!(output.summary.untested, 1);
        assert_eq!(output.summary.failing_before, 0);
    }
}

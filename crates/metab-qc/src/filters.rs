//! Optional feature filters between cleaning and normalization.
//!
//! Each enabled filter removes whole metabolite columns and records a
//! numbered step listing the removed names. The optional z-score step
//! rescales the surviving columns and is recorded as a note.

use metab_ingest::QcSheet;
use metab_model::{CanonicalDataset, FeatureFilterConfig};
use serde::Serialize;
use tracing::info;

use crate::error::{QcError, Result};
use crate::stats::{mean, present, quantile, sample_std};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterEntry {
    /// A filter that removed columns.
    Step { summary: String, removed: Vec<String> },
    /// A transformation that removed nothing.
    Note(String),
}

/// Ordered account of the feature filters applied to one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterLog {
    pub original_count: usize,
    pub entries: Vec<FilterEntry>,
    pub final_count: usize,
}

impl FilterLog {
    fn new(original_count: usize) -> Self {
        Self {
            original_count,
            entries: Vec::new(),
            final_count: original_count,
        }
    }

    fn step(&mut self, summary: String, removed: Vec<String>) {
        info!(removed = removed.len(), "{summary}");
        self.entries.push(FilterEntry::Step { summary, removed });
    }

    /// Total number of columns removed across all steps.
    pub fn removed_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                FilterEntry::Step { removed, .. } => removed.len(),
                FilterEntry::Note(_) => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub dataset: CanonicalDataset,
    pub log: FilterLog,
}

/// Relative standard deviation in percent; `None` when undefined.
pub fn relative_std(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let std = sample_std(values)?;
    let rsd = std / mean * 100.0;
    rsd.is_finite().then_some(rsd)
}

/// Removes dataset columns whose pooled-QC RSD exceeds `threshold` percent.
pub fn filter_by_rsd(dataset: &mut CanonicalDataset, qc: &QcSheet, threshold: f64) -> Vec<String> {
    dataset.retain_metabolites(|column| {
        qc.column(&column.name)
            .and_then(|qc_column| relative_std(&present(&qc_column.values)))
            .is_none_or(|rsd| rsd <= threshold)
    })
}

/// Removes columns whose interquartile range is below `threshold`.
pub fn filter_by_iqr(dataset: &mut CanonicalDataset, threshold: f64) -> Result<Vec<String>> {
    let mut narrow = Vec::new();
    for column in dataset.metabolites() {
        let values = present(&column.values);
        if let (Some(q3), Some(q1)) = (quantile(&values, 0.75)?, quantile(&values, 0.25)?)
            && q3 - q1 < threshold
        {
            narrow.push(column.name.clone());
        }
    }
    Ok(dataset.retain_metabolites(|column| !narrow.contains(&column.name)))
}

/// Removes columns whose mean is below `threshold`.
pub fn filter_by_baseline(dataset: &mut CanonicalDataset, threshold: f64) -> Vec<String> {
    dataset.retain_metabolites(|column| {
        mean(&present(&column.values)).is_none_or(|value| value >= threshold)
    })
}

/// Rescales every column to zero mean and unit sample standard deviation.
///
/// Columns without spread become all zeros.
pub fn z_score(dataset: &mut CanonicalDataset) {
    for column in dataset.metabolites_mut() {
        let values = present(&column.values);
        let (Some(center), spread) = (mean(&values), sample_std(&values)) else {
            continue;
        };
        for value in column.values.iter_mut().flatten() {
            *value = match spread {
                Some(spread) if spread > 0.0 => (*value - center) / spread,
                _ => 0.0,
            };
        }
    }
}

/// Applies the enabled filters in order: RSD, IQR, baseline, z-score.
pub fn apply_feature_filters(
    mut dataset: CanonicalDataset,
    config: &FeatureFilterConfig,
    qc: Option<&QcSheet>,
) -> Result<FilterOutcome> {
    let mut log = FilterLog::new(dataset.metabolite_count());
    if config.perform_qc {
        let qc = qc.ok_or(QcError::MissingQcSheet)?;
        let removed = filter_by_rsd(&mut dataset, qc, config.rsd_threshold);
        log.step(
            format!(
                "Number of metabolites removed based on RSD threshold ({}%): {}",
                config.rsd_threshold,
                removed.len()
            ),
            removed,
        );
    }
    if config.filter_iqr {
        let removed = filter_by_iqr(&mut dataset, config.iqr_threshold)?;
        log.step(
            format!("Number of metabolites removed with low IQR: {}", removed.len()),
            removed,
        );
    }
    if config.filter_baseline {
        let removed = filter_by_baseline(&mut dataset, config.baseline_threshold);
        log.step(
            format!(
                "Number of metabolites removed close to baseline or detection limit: {}",
                removed.len()
            ),
            removed,
        );
    }
    if config.normalize {
        z_score(&mut dataset);
        log.entries
            .push(FilterEntry::Note("Normalized the data.".to_string()));
    }
    log.final_count = dataset.metabolite_count();
    Ok(FilterOutcome { dataset, log })
}

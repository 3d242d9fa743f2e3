//! Typed configuration for the cleaning, filtering and normalization stages.
//!
//! Every option has a named field and a documented default. Constructors
//! range-check thresholds once so the stages never re-validate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Method for replacing outlying metabolite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Leave outliers untouched.
    #[default]
    None,
    /// Replace values beyond `nSD` deviations from the median with the median.
    Median,
    /// Cap values beyond `mean ± nSD * std` at the nearest bound.
    Clip,
}

impl FromStr for OutlierMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "median" => Ok(Self::Median),
            "clip" => Ok(Self::Clip),
            other => Err(ModelError::UnknownChoice {
                field: "replace_outlier_method",
                value: other.to_string(),
                expected: "None, median, clip",
            }),
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "None",
            Self::Median => "median",
            Self::Clip => "clip",
        })
    }
}

/// Strategy for filling the missing values left after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImputeMethod {
    /// Half of the column minimum.
    #[default]
    HalfMin,
    Median,
    Mean,
    Zero,
}

impl FromStr for ImputeMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "half-min" | "halfmin" | "half_min" => Ok(Self::HalfMin),
            "median" => Ok(Self::Median),
            "mean" => Ok(Self::Mean),
            "zero" => Ok(Self::Zero),
            other => Err(ModelError::UnknownChoice {
                field: "impute_method",
                value: other.to_string(),
                expected: "half-min, median, mean, zero",
            }),
        }
    }
}

impl fmt::Display for ImputeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HalfMin => "half-min",
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Zero => "zero",
        })
    }
}

fn check_fraction(field: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(ModelError::OutOfRange {
            field,
            range: "[0, 1]",
            value: v,
        }),
        _ => Ok(()),
    }
}

/// Options of the cleaning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcConfig {
    /// Drop metabolites with at most one distinct value.
    pub filter_column_constant: bool,
    /// Drop columns whose missing count reaches `rows * threshold`.
    pub filter_column_missing_rate_threshold: Option<f64>,
    /// Drop rows whose missing count reaches `columns * threshold`.
    pub filter_row_missing_rate_threshold: Option<f64>,
    /// Drop columns whose zero count reaches `rows * threshold`.
    pub filter_column_zero_rate_threshold: Option<f64>,
    pub replace_outlier_method: OutlierMethod,
    /// Outlier threshold in standard deviations.
    #[serde(rename = "nSD")]
    pub n_sd: f64,
    pub impute_method: ImputeMethod,
    /// Echo change-log entries at info level.
    pub verbose: bool,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            filter_column_constant: true,
            filter_column_missing_rate_threshold: Some(0.5),
            filter_row_missing_rate_threshold: None,
            filter_column_zero_rate_threshold: Some(0.25),
            replace_outlier_method: OutlierMethod::None,
            n_sd: 5.0,
            impute_method: ImputeMethod::HalfMin,
            verbose: true,
        }
    }
}

impl QcConfig {
    /// Checks every threshold once; call after assembling the options.
    pub fn validate(self) -> Result<Self> {
        check_fraction(
            "filter_column_missing_rate_threshold",
            self.filter_column_missing_rate_threshold,
        )?;
        check_fraction(
            "filter_row_missing_rate_threshold",
            self.filter_row_missing_rate_threshold,
        )?;
        check_fraction(
            "filter_column_zero_rate_threshold",
            self.filter_column_zero_rate_threshold,
        )?;
        if !(self.n_sd.is_finite() && self.n_sd > 0.0) {
            return Err(ModelError::OutOfRange {
                field: "nSD",
                range: "(0, inf)",
                value: self.n_sd,
            });
        }
        Ok(self)
    }
}

/// What the normalizer does with a column that fails the normality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalityAction {
    /// Replace the column with `ln(1 + value - min)`.
    #[default]
    Log,
    /// Remove the column from the normalized variant.
    Drop,
}

impl FromStr for NormalityAction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "drop" => Ok(Self::Drop),
            other => Err(ModelError::UnknownChoice {
                field: "normality_action",
                value: other.to_string(),
                expected: "log, drop",
            }),
        }
    }
}

impl fmt::Display for NormalityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Log => "log",
            Self::Drop => "drop",
        })
    }
}

/// Options of the distribution normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Columns with a Shapiro-Wilk p-value at or below this are non-normal.
    pub normality_threshold: f64,
    pub action: NormalityAction,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            normality_threshold: 0.05,
            action: NormalityAction::Log,
        }
    }
}

impl NormalizerConfig {
    pub fn validate(self) -> Result<Self> {
        check_fraction("normality_threshold", Some(self.normality_threshold))?;
        Ok(self)
    }
}

/// Outlier capping applied to the assembled dataset before it is written.
///
/// A column is capped only when it looks normal: its Shapiro-Wilk p-value
/// must exceed `normality_threshold`. Columns with fewer than three present
/// values are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonizeCleanupConfig {
    pub clip_outliers: bool,
    /// Bounds sit at `mean ± n_sd * sample_std`.
    pub n_sd: f64,
    pub normality_threshold: f64,
}

impl Default for HarmonizeCleanupConfig {
    fn default() -> Self {
        Self {
            clip_outliers: true,
            n_sd: 3.0,
            normality_threshold: 0.03,
        }
    }
}

impl HarmonizeCleanupConfig {
    pub fn validate(self) -> Result<Self> {
        check_fraction(
            "harmonize_normality_threshold",
            Some(self.normality_threshold),
        )?;
        if !(self.n_sd.is_finite() && self.n_sd > 0.0) {
            return Err(ModelError::OutOfRange {
                field: "harmonize_nsd",
                range: "(0, inf)",
                value: self.n_sd,
            });
        }
        Ok(self)
    }
}

/// Optional column filters that run between cleaning and normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFilterConfig {
    /// Remove metabolites whose pooled-QC RSD exceeds `rsd_threshold`.
    pub perform_qc: bool,
    /// RSD threshold in percent.
    pub rsd_threshold: f64,
    pub filter_iqr: bool,
    pub iqr_threshold: f64,
    pub filter_baseline: bool,
    pub baseline_threshold: f64,
    /// Apply z-score normalization to the surviving columns.
    pub normalize: bool,
}

impl Default for FeatureFilterConfig {
    fn default() -> Self {
        Self {
            perform_qc: false,
            rsd_threshold: 20.0,
            filter_iqr: false,
            iqr_threshold: 0.1,
            filter_baseline: false,
            baseline_threshold: 0.1,
            normalize: false,
        }
    }
}

impl FeatureFilterConfig {
    pub fn validate(self) -> Result<Self> {
        if !(self.rsd_threshold.is_finite() && self.rsd_threshold >= 0.0) {
            return Err(ModelError::OutOfRange {
                field: "rsd_threshold",
                range: "[0, inf)",
                value: self.rsd_threshold,
            });
        }
        if !(self.iqr_threshold.is_finite() && self.iqr_threshold >= 0.0) {
            return Err(ModelError::OutOfRange {
                field: "iqr_threshold",
                range: "[0, inf)",
                value: self.iqr_threshold,
            });
        }
        if !self.baseline_threshold.is_finite() {
            return Err(ModelError::OutOfRange {
                field: "baseline_threshold",
                range: "finite",
                value: self.baseline_threshold,
            });
        }
        Ok(self)
    }

    /// True when at least one filter or the z-score step is enabled.
    pub fn any_enabled(&self) -> bool {
        self.perform_qc || self.filter_iqr || self.filter_baseline || self.normalize
    }
}

/// A named group of phenotype labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    /// Member phenotypes, compared after canonicalization.
    pub members: Vec<String>,
}

/// Two labels to compare, named explicitly by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPair {
    pub first: String,
    pub second: String,
}

impl GroupPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Result<Self> {
        let first = first.into().trim().to_string();
        let second = second.into().trim().to_string();
        if first.is_empty() || second.is_empty() {
            return Err(ModelError::InvalidGroup(
                "compare_groups needs two non-empty labels".to_string(),
            ));
        }
        if first.eq_ignore_ascii_case(&second) {
            return Err(ModelError::InvalidGroup(format!(
                "compare_groups names '{first}' twice"
            )));
        }
        Ok(Self { first, second })
    }
}

/// Phenotype grouping options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingConfig {
    pub groups: Vec<GroupDefinition>,
    pub compare: Option<GroupPair>,
}

impl GroupingConfig {
    pub fn validate(self) -> Result<Self> {
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ModelError::InvalidGroup("group without a name".to_string()));
            }
            if group.members.is_empty() {
                return Err(ModelError::InvalidGroup(format!(
                    "group '{}' has no members",
                    group.name
                )));
            }
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.compare.is_none()
    }
}

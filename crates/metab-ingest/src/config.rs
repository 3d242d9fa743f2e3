//! Pipeline configuration file parsing.
//!
//! The format is one `key = value` assignment per line. `#` comments and
//! blank lines are skipped, unknown keys are ignored, and repeated keys keep
//! the last value except group members, which accumulate under the most
//! recent matching `groupN_name`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use metab_model::{
    FeatureFilterConfig, GroupDefinition, GroupPair, GroupingConfig, HarmonizeCleanupConfig,
    ModelError, NormalizerConfig, QcConfig,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell::{is_none_literal, parse_bool, parse_numeric};
use crate::error::{IngestError, Result};
use crate::schema::SourceSchemas;

/// Locations of the source sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPaths {
    pub metabolite_file: PathBuf,
    pub meta_file: PathBuf,
    pub master_file: PathBuf,
    /// Pooled QC sheet; required only when the RSD filter is enabled.
    pub qc_file: Option<PathBuf>,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            metabolite_file: PathBuf::from("input/metabolite_data.csv"),
            meta_file: PathBuf::from("input/meta_data.csv"),
            master_file: PathBuf::from("input/master_data.csv"),
            qc_file: None,
        }
    }
}

/// Everything one pipeline run needs, parsed and range-checked once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub inputs: InputPaths,
    pub output_dir: PathBuf,
    pub schemas: SourceSchemas,
    pub harmonize: HarmonizeCleanupConfig,
    pub qc: QcConfig,
    pub filters: FeatureFilterConfig,
    pub normalizer: NormalizerConfig,
    pub grouping: GroupingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            output_dir: PathBuf::from("processed"),
            schemas: SourceSchemas::default(),
            harmonize: HarmonizeCleanupConfig::default(),
            qc: QcConfig::default(),
            filters: FeatureFilterConfig::default(),
            normalizer: NormalizerConfig::default(),
            grouping: GroupingConfig::default(),
        }
    }
}

impl PipelineConfig {
    fn validate(self, path: &Path) -> Result<Self> {
        let invalid = |source: ModelError| IngestError::InvalidConfig {
            path: path.to_path_buf(),
            source,
        };
        Ok(Self {
            harmonize: self.harmonize.validate().map_err(invalid)?,
            qc: self.qc.validate().map_err(invalid)?,
            filters: self.filters.validate().map_err(invalid)?,
            normalizer: self.normalizer.validate().map_err(invalid)?,
            grouping: self.grouping.validate().map_err(invalid)?,
            ..self
        })
    }
}

struct LineParser<'a> {
    path: &'a Path,
    line: usize,
    key: &'a str,
    value: &'a str,
}

impl LineParser<'_> {
    fn syntax(&self, reason: String) -> IngestError {
        IngestError::ConfigSyntax {
            path: self.path.to_path_buf(),
            line: self.line,
            reason,
        }
    }

    fn boolean(&self) -> Result<bool> {
        parse_bool(self.value).ok_or_else(|| {
            self.syntax(format!(
                "{} expects yes/no or true/false, got '{}'",
                self.key, self.value
            ))
        })
    }

    fn number(&self) -> Result<f64> {
        parse_numeric(self.value).ok_or_else(|| {
            self.syntax(format!("{} expects a number, got '{}'", self.key, self.value))
        })
    }

    fn optional_number(&self) -> Result<Option<f64>> {
        if is_none_literal(self.value) {
            Ok(None)
        } else {
            self.number().map(Some)
        }
    }

    fn path(&self) -> Result<PathBuf> {
        if self.value.is_empty() {
            return Err(self.syntax(format!("{} expects a path", self.key)));
        }
        Ok(PathBuf::from(self.value))
    }

    fn choice<T: FromStr<Err = ModelError>>(&self) -> Result<T> {
        self.value.parse().map_err(|source| IngestError::InvalidConfig {
            path: self.path.to_path_buf(),
            source,
        })
    }

    fn pair(&self) -> Result<GroupPair> {
        let labels: Vec<&str> = self.value.split(',').map(str::trim).collect();
        let &[first, second] = labels.as_slice() else {
            return Err(self.syntax(format!(
                "compare_groups expects two comma-separated labels, got '{}'",
                self.value
            )));
        };
        GroupPair::new(first, second).map_err(|source| IngestError::InvalidConfig {
            path: self.path.to_path_buf(),
            source,
        })
    }
}

/// Group definitions keyed by their `groupN` prefix, in declaration order.
#[derive(Default)]
struct GroupCollector {
    groups: Vec<(String, GroupDefinition)>,
    current: Option<usize>,
}

impl GroupCollector {
    fn name(&mut self, prefix: &str, name: &str) {
        let index = match self.groups.iter().position(|(key, _)| key == prefix) {
            Some(index) => {
                self.groups[index].1.name = name.to_string();
                index
            }
            None => {
                self.groups.push((
                    prefix.to_string(),
                    GroupDefinition {
                        name: name.to_string(),
                        members: Vec::new(),
                    },
                ));
                self.groups.len() - 1
            }
        };
        self.current = Some(index);
    }

    /// Adds a member to the group whose prefix owns `key`, else to the most
    /// recently named group.
    fn member(&mut self, key: &str, member: &str) -> bool {
        let owner = self
            .groups
            .iter()
            .position(|(prefix, _)| {
                key.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('_'))
            })
            .or(self.current);
        match owner {
            Some(index) => {
                if !member.is_empty() {
                    self.groups[index].1.members.push(member.to_string());
                }
                true
            }
            None => false,
        }
    }

    fn finish(self) -> Vec<GroupDefinition> {
        self.groups.into_iter().map(|(_, group)| group).collect()
    }
}

/// Parses configuration text; `path` is used for error reporting only.
pub fn parse_config_str(text: &str, path: &Path) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();
    let mut groups = GroupCollector::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let number = index + 1;
        let Some((raw_key, raw_value)) = line.split_once('=') else {
            return Err(IngestError::ConfigSyntax {
                path: path.to_path_buf(),
                line: number,
                reason: format!("expected 'key = value', got '{line}'"),
            });
        };
        let key_lower = raw_key.trim().to_lowercase();
        let parser = LineParser {
            path,
            line: number,
            key: &key_lower,
            value: raw_value.trim(),
        };

        match parser.key {
            "metabolite_file" => config.inputs.metabolite_file = parser.path()?,
            "meta_file" => config.inputs.meta_file = parser.path()?,
            "master_file" => config.inputs.master_file = parser.path()?,
            "qc_file" => {
                config.inputs.qc_file = if is_none_literal(parser.value) {
                    None
                } else {
                    Some(parser.path()?)
                };
            }
            "output_dir" => config.output_dir = parser.path()?,
            "harmonize_clip_outliers" => config.harmonize.clip_outliers = parser.boolean()?,
            "harmonize_nsd" => config.harmonize.n_sd = parser.number()?,
            "harmonize_normality_threshold" => {
                config.harmonize.normality_threshold = parser.number()?
            }
            "filter_column_constant" => config.qc.filter_column_constant = parser.boolean()?,
            "filter_column_missing_rate_threshold" => {
                config.qc.filter_column_missing_rate_threshold = parser.optional_number()?
            }
            "filter_row_missing_rate_threshold" => {
                config.qc.filter_row_missing_rate_threshold = parser.optional_number()?
            }
            "filter_column_zero_rate_threshold" => {
                config.qc.filter_column_zero_rate_threshold = parser.optional_number()?
            }
            "replace_outlier_method" => config.qc.replace_outlier_method = parser.choice()?,
            "nsd" => config.qc.n_sd = parser.number()?,
            "impute_method" => config.qc.impute_method = parser.choice()?,
            "verbose" => config.qc.verbose = parser.boolean()?,
            "normality_threshold" => config.normalizer.normality_threshold = parser.number()?,
            "normality_action" => config.normalizer.action = parser.choice()?,
            "perform_qc" => config.filters.perform_qc = parser.boolean()?,
            "rsd_threshold" => config.filters.rsd_threshold = parser.number()?,
            "filter_iqr" => config.filters.filter_iqr = parser.boolean()?,
            "iqr_threshold" => config.filters.iqr_threshold = parser.number()?,
            "filter_baseline" => config.filters.filter_baseline = parser.boolean()?,
            "baseline_threshold" => config.filters.baseline_threshold = parser.number()?,
            "normalize" => config.filters.normalize = parser.boolean()?,
            "compare_groups" => config.grouping.compare = Some(parser.pair()?),
            "group_input_file" => debug!(line = number, "group_input_file is ignored"),
            key if key.starts_with("group") => {
                if let Some(prefix) = key.strip_suffix("_name") {
                    groups.name(prefix, parser.value);
                } else if !groups.member(key, parser.value) {
                    return Err(parser.syntax(format!("{key} appears before any group name")));
                }
            }
            key => debug!(line = number, key, "ignoring unknown configuration key"),
        }
    }

    config.grouping.groups = groups.finish();
    config.validate(path)
}

/// Reads and parses a configuration file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::read(path, source))?;
    let config = parse_config_str(&text, path)?;
    debug!(
        path = %path.display(),
        groups = config.grouping.groups.len(),
        "loaded configuration"
    );
    Ok(config)
}

//! `run_manifest.json`: provenance for one pipeline run.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{OutputError, Result};

pub const MANIFEST_SCHEMA: &str = "metab.run-manifest";
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDigest {
    pub path: PathBuf,
    pub sha256: String,
}

impl FileDigest {
    /// Hashes the file at `path` as it is on disk now.
    pub fn of_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| OutputError::Digest {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            sha256: sha256_hex(&bytes),
        })
    }
}

/// Row and column counts reported by the stages that ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harmonize: Option<HarmonizeCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<NormalizeCounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarmonizeCounts {
    pub candidates: usize,
    pub valid: usize,
    pub two_vial: usize,
    pub not_in_master: usize,
    pub phenotype_mismatches: usize,
    pub rows: usize,
    pub unmatched: usize,
    /// Values capped by the normality-gated clip.
    pub outliers_corrected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanCounts {
    pub rows_before: usize,
    pub rows_after: usize,
    pub metabolites_before: usize,
    pub metabolites_after: usize,
    pub outliers_replaced: usize,
    pub values_imputed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub metabolites_before: usize,
    pub metabolites_after: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeCounts {
    pub tested: usize,
    pub failing_before: usize,
    pub failing_after: usize,
    pub transformed: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub schema: &'static str,
    pub schema_version: u32,
    pub generated_at: String,
    pub tool_version: &'static str,
    pub command: String,
    pub inputs: Vec<FileDigest>,
    pub config: serde_json::Value,
    pub counts: StageCounts,
    /// Filled in when the artifacts are staged.
    pub outputs: Vec<FileDigest>,
}

impl RunManifest {
    /// Starts a manifest for `command`, hashing every input file.
    pub fn new(
        command: impl Into<String>,
        inputs: &[&Path],
        config: &impl Serialize,
    ) -> Result<Self> {
        let inputs = inputs
            .iter()
            .map(|path| FileDigest::of_file(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            schema: MANIFEST_SCHEMA,
            schema_version: MANIFEST_SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tool_version: env!("CARGO_PKG_VERSION"),
            command: command.into(),
            inputs,
            config: serde_json::to_value(config)?,
            counts: StageCounts::default(),
            outputs: Vec::new(),
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_manifest_hashes_inputs() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();

        let config = serde_json::json!({ "nSD": 5.0 });
        let mut manifest = RunManifest::new("run", &[file.path()], &config).unwrap();
        manifest.counts.filter = Some(FilterCounts {
            metabolites_before: 4,
            metabolites_after: 3,
        });
        let value: serde_json::Value =
            serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(value["schema"], MANIFEST_SCHEMA);
        assert_eq!(
            value["inputs"][0]["sha256"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(value["config"]["nSD"], 5.0);
        assert_eq!(value["counts"]["filter"]["metabolites_after"], 3);
        assert!(value["counts"].get("clean").is_none());
    }

    #[test]
    fn test_missing_input_is_reported() {
        let err = FileDigest::of_file(Path::new("/nonexistent/master.csv")).unwrap_err();
        assert!(matches!(err, OutputError::Digest { .. }));
    }
}

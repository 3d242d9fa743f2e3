//! Staging and writing the artifacts of one run.
//!
//! Every artifact is rendered to bytes first. Only [`ArtifactSet::write_to`]
//! touches the file system, so a failure while rendering leaves the output
//! directory as it was.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use metab_model::CanonicalDataset;
use tracing::{debug, info, info_span};

use crate::dataset::render_dataset_csv;
use crate::error::{OutputError, Result};
use crate::manifest::{FileDigest, RunManifest, sha256_hex};

pub const HARMONIZED_DATA: &str = "harmonized_data.csv";
pub const PATIENTS_SUMMARY: &str = "patients_summary.txt";
pub const CLEANUP_STATS: &str = "data_cleanup_stats.txt";
pub const CLEANED_DATA: &str = "processed_cleaned_data.csv";
pub const CHANGES_LOG: &str = "changes_log.txt";
pub const FILTER_LOG: &str = "filter_log.txt";
pub const RANKED_DATA: &str = "ranked_data.csv";
pub const NORMALIZED_DATA: &str = "normalized_data.csv";
pub const NORMALITY_SUMMARY: &str = "normality_summary.txt";
pub const RUN_MANIFEST: &str = "run_manifest.json";

/// `<stem>.csv`.
pub fn dataset_file_name(stem: &str) -> String {
    format!("{stem}.csv")
}

/// `<stem>_ranked.csv`.
pub fn ranked_file_name(stem: &str) -> String {
    format!("{stem}_ranked.csv")
}

#[derive(Debug, Clone)]
struct Artifact {
    file_name: String,
    bytes: Vec<u8>,
}

/// Artifacts rendered in memory, in staging order.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn stage(&mut self, file_name: String, bytes: Vec<u8>) -> Result<()> {
        if self.contains(&file_name) {
            return Err(OutputError::DuplicateArtifact(file_name));
        }
        self.artifacts.push(Artifact { file_name, bytes });
        Ok(())
    }

    pub fn stage_dataset(
        &mut self,
        file_name: impl Into<String>,
        dataset: &CanonicalDataset,
    ) -> Result<()> {
        let file_name = file_name.into();
        let bytes = render_dataset_csv(&file_name, dataset)?;
        self.stage(file_name, bytes)
    }

    pub fn stage_text(&mut self, file_name: impl Into<String>, text: String) -> Result<()> {
        self.stage(file_name.into(), text.into_bytes())
    }

    /// Records the digest of every staged artifact in `manifest` and stages it last.
    pub fn stage_manifest(&mut self, mut manifest: RunManifest) -> Result<()> {
        manifest.outputs = self
            .artifacts
            .iter()
            .map(|artifact| FileDigest {
                path: PathBuf::from(&artifact.file_name),
                sha256: sha256_hex(&artifact.bytes),
            })
            .collect();
        let bytes = manifest.to_json()?;
        self.stage(RUN_MANIFEST.to_string(), bytes)
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.artifacts
            .iter()
            .any(|artifact| artifact.file_name == file_name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.artifacts
            .iter()
            .map(|artifact| artifact.file_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Writes every staged artifact under `output_dir`, creating it if needed.
    ///
    /// Existing files with the same names are overwritten.
    pub fn write_to(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        info_span!("write", output_dir = %output_dir.display()).in_scope(|| -> Result<_> {
            let start = Instant::now();
            std::fs::create_dir_all(output_dir).map_err(|source| OutputError::Io {
                path: output_dir.to_path_buf(),
                source,
            })?;
            let mut written = Vec::with_capacity(self.artifacts.len());
            for artifact in &self.artifacts {
                let path = output_dir.join(&artifact.file_name);
                write_file(&path, &artifact.bytes)?;
                debug!(path = %path.display(), bytes = artifact.bytes.len(), "artifact written");
                written.push(path);
            }
            info!(
                artifacts = written.len(),
                duration_ms = start.elapsed().as_millis(),
                "artifacts written"
            );
            Ok(written)
        })
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_error = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

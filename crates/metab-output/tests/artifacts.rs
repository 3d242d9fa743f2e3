//! Staged artifacts on disk.

use metab_ingest::read_canonical_dataset;
use metab_model::{CanonicalDataset, MetaboliteColumn, PatientId, PatientMeta};
use metab_output::{ArtifactSet, CLEANED_DATA, RUN_MANIFEST, RunManifest};
use tempfile::TempDir;

fn dataset() -> CanonicalDataset {
    CanonicalDataset::new(
        vec!["Vial".to_string(), "Sex".to_string()],
        vec![
            PatientMeta {
                patient_id: PatientId::new(42),
                descriptors: vec!["7".to_string(), "F".to_string()],
                phenotype: "kwashiorkor".to_string(),
            },
            PatientMeta {
                patient_id: PatientId::new(51),
                descriptors: vec!["8".to_string(), "M".to_string()],
                phenotype: "control".to_string(),
            },
        ],
        vec![
            MetaboliteColumn::new("alanine", vec![Some(2.125), Some(0.5)]),
            MetaboliteColumn::new("glycine", vec![None, Some(3.0)]),
        ],
    )
    .unwrap()
}

#[test]
fn written_dataset_reads_back() {
    let dir = TempDir::new().unwrap();
    let original = dataset();
    let mut set = ArtifactSet::new();
    set.stage_dataset(CLEANED_DATA, &original).unwrap();
    set.write_to(dir.path()).unwrap();

    let restored = read_canonical_dataset(&dir.path().join(CLEANED_DATA)).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn manifest_lists_staged_outputs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("meta_data.csv");
    std::fs::write(&input, "vial,x\n").unwrap();

    let mut set = ArtifactSet::new();
    set.stage_dataset(CLEANED_DATA, &dataset()).unwrap();
    let manifest = RunManifest::new("clean", &[input.as_path()], &serde_json::json!({})).unwrap();
    set.stage_manifest(manifest).unwrap();
    assert_eq!(set.file_names().last(), Some(RUN_MANIFEST));

    let written = set.write_to(&dir.path().join("processed")).unwrap();
    assert_eq!(written.len(), 2);
    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(manifest["command"], "clean");
    assert_eq!(manifest["outputs"][0]["path"], CLEANED_DATA);
    let csv = std::fs::read(&written[0]).unwrap();
    assert_eq!(manifest["outputs"][0]["sha256"], metab_output::sha256_hex(&csv));
}

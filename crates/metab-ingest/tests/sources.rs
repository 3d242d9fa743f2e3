//! Loading a full set of source sheets and a configuration from disk.

use std::fs;
use std::path::Path;

use metab_ingest::{
    IngestError, SourceSchemas, load_config, load_master_sheet, load_metabolite_sheet,
    load_metadata_sheet,
};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write fixture");
}

#[test]
fn loads_sheets_named_by_config() {
    let dir = TempDir::new().expect("temp dir");
    write(
        dir.path(),
        "metabolites.csv",
        "a,b,c,d,e,f,g,alanine,glycine\nh\nh\nh\nh\nx,42,,,,,,1,2\n",
    );
    write(
        dir.path(),
        "meta.csv",
        "vial,x,patient,a,b,c,d,diagnosis\nV-007,,42,,,,,kwashiorkor\n",
    );
    write(
        dir.path(),
        "master.csv",
        "Vial,Diagnosis,Sex,Age,Site,Weight,Height\n7,kwashiorkor,F,3,A,9.1,80\n",
    );
    let config_text = format!(
        "metabolite_file = {}\nmeta_file = {}\nmaster_file = {}\noutput_dir = {}\n",
        dir.path().join("metabolites.csv").display(),
        dir.path().join("meta.csv").display(),
        dir.path().join("master.csv").display(),
        dir.path().join("out").display(),
    );
    write(dir.path(), "config.txt", &config_text);

    let config = load_config(&dir.path().join("config.txt")).expect("config");
    let schemas = SourceSchemas::default();
    let metabolites =
        load_metabolite_sheet(&config.inputs.metabolite_file, &schemas.metabolite).expect("sheet");
    let metadata = load_metadata_sheet(&config.inputs.meta_file, &schemas.metadata).expect("sheet");
    let master = load_master_sheet(&config.inputs.master_file, &schemas.master).expect("sheet");

    assert_eq!(metabolites.rows.len(), 1);
    assert_eq!(metadata.rows[0].vial_cell, "V-007");
    assert_eq!(master.descriptor_names[0], "Vial");
    assert_eq!(config.output_dir, dir.path().join("out"));
}

#[test]
fn missing_source_is_reported_with_path() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("absent.csv");
    let err = load_metadata_sheet(&path, &SourceSchemas::default().metadata).unwrap_err();
    match err {
        IngestError::FileNotFound { path: reported } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

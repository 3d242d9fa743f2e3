//! End-to-end matching from sheets on disk, plus matcher properties.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use metab_harmonize::{RecordMatcher, SourceSheets, harmonize};
use metab_ingest::{
    MasterRow, MasterSheet, MetaboliteRow, MetaboliteSheet, MetadataRow, MetadataSheet,
    SourceSchemas, load_master_sheet, load_metabolite_sheet, load_metadata_sheet,
};
use metab_model::{AuditReport, PatientId};
use proptest::prelude::*;
use tempfile::TempDir;

#[test]
fn round_trip_single_patient() {
    let dir = TempDir::new().expect("temp dir");
    let metabolite_path = dir.path().join("metabolite_data.csv");
    let meta_path = dir.path().join("meta_data.csv");
    let master_path = dir.path().join("master_data.csv");
    fs::write(
        &metabolite_path,
        "name,id,a,b,c,d,e,alanine,glycine\nunit\nunit\nunit\nunit\nS1,42,,,,,,1.25,3\n",
    )
    .expect("write metabolites");
    fs::write(
        &meta_path,
        "Vial,Site,Patient,a,b,c,d,Subject Diagnosis\nV-007,A,42,,,,,kwashiorkor\n",
    )
    .expect("write metadata");
    fs::write(
        &master_path,
        "Vial,Diagnosis,Sex,Age,Site,Weight,Height\n7,kwashiorkor,F,3,A,9.1,80\n",
    )
    .expect("write master");

    let schemas = SourceSchemas::default();
    let metabolites = load_metabolite_sheet(&metabolite_path, &schemas.metabolite).expect("load");
    let metadata = load_metadata_sheet(&meta_path, &schemas.metadata).expect("load");
    let master = load_master_sheet(&master_path, &schemas.master).expect("load");

    let harmonized = harmonize(SourceSheets {
        metabolites: &metabolites,
        metadata: &metadata,
        master: &master,
    })
    .expect("harmonize");

    assert_eq!(harmonized.matched.report.valid, vec![PatientId::new(42)]);
    let dataset = &harmonized.assembly.dataset;
    assert_eq!(dataset.row_count(), 1);
    assert_eq!(dataset.patients()[0].patient_id, PatientId::new(42));
    assert_eq!(dataset.patients()[0].phenotype, "kwashiorkor");
    assert_eq!(dataset.patients()[0].descriptors[0], "7");
    assert_eq!(dataset.metabolite("alanine").expect("column").values, vec![Some(1.25)]);
}

const PHENOTYPES: [&str; 2] = ["control", "kwashiorkor"];

fn phenotype_for(patient: u32) -> &'static str {
    PHENOTYPES[(patient % 2) as usize]
}

fn metabolite_sheet(patients: u32) -> MetaboliteSheet {
    MetaboliteSheet {
        path: PathBuf::from("metabolites.csv"),
        names: vec!["alanine".to_string()],
        rows: (1..=patients)
            .map(|id| MetaboliteRow {
                row: id as usize + 4,
                patient_cell: id.to_string(),
                values: vec!["1".to_string()],
            })
            .collect(),
    }
}

fn metadata_sheet(claims: &[(u64, u32)]) -> MetadataSheet {
    MetadataSheet {
        path: PathBuf::from("meta.csv"),
        rows: claims
            .iter()
            .enumerate()
            .map(|(index, (vial, patient))| MetadataRow {
                row: index + 1,
                patient_cell: patient.to_string(),
                vial_cell: format!("V-{vial}"),
                phenotype: phenotype_for(*patient).to_string(),
            })
            .collect(),
    }
}

fn master_sheet(rows: &[(u64, usize)]) -> MasterSheet {
    MasterSheet {
        path: PathBuf::from("master.csv"),
        descriptor_names: vec!["Vial".to_string()],
        rows: rows
            .iter()
            .enumerate()
            .map(|(index, (vial, phenotype))| MasterRow {
                row: index + 1,
                vial_cell: vial.to_string(),
                phenotype: PHENOTYPES[*phenotype].to_string(),
                descriptors: vec![vial.to_string()],
            })
            .collect(),
    }
}

fn sorted(ids: &[PatientId]) -> Vec<PatientId> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids
}

fn as_sets(report: &AuditReport) -> (Vec<PatientId>, Vec<PatientId>, Vec<PatientId>) {
    (
        sorted(&report.valid),
        sorted(&report.two_vial),
        sorted(&report.not_in_master),
    )
}

/// Distinct patients claiming each vial.
fn claimants(claims: &[(u64, u32)]) -> BTreeMap<u64, BTreeSet<u32>> {
    let mut claimants: BTreeMap<u64, BTreeSet<u32>> = BTreeMap::new();
    for (vial, patient) in claims {
        claimants.entry(*vial).or_default().insert(*patient);
    }
    claimants
}

fn claims_strategy() -> impl Strategy<Value = Vec<(u64, u32)>> {
    prop::collection::vec((0u64..6, 1u32..9), 0..16)
}

fn master_strategy() -> impl Strategy<Value = Vec<(u64, usize)>> {
    prop::collection::vec((0u64..6, 0usize..2), 0..10)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matching_is_idempotent(claims in claims_strategy(), master in master_strategy()) {
        let metabolites = metabolite_sheet(8);
        let metadata = metadata_sheet(&claims);
        let master = master_sheet(&master);
        let matcher = RecordMatcher::new(&metabolites, &metadata, &master);
        let first = matcher.run().expect("first run");
        let second = matcher.run().expect("second run");
        prop_assert_eq!(first.report, second.report);
    }

    #[test]
    fn matching_ignores_metadata_row_order(
        claims in claims_strategy().prop_flat_map(|claims| {
            let shuffled = Just(claims.clone()).prop_shuffle();
            (Just(claims), shuffled)
        }),
        master in master_strategy(),
    ) {
        let (original, shuffled) = claims;
        let metabolites = metabolite_sheet(8);
        let master = master_sheet(&master);
        let left_meta = metadata_sheet(&original);
        let right_meta = metadata_sheet(&shuffled);
        let left = RecordMatcher::new(&metabolites, &left_meta, &master).run().expect("run");
        let right = RecordMatcher::new(&metabolites, &right_meta, &master).run().expect("run");
        prop_assert_eq!(as_sets(&left.report), as_sets(&right.report));
    }

    #[test]
    fn surviving_vials_have_exactly_one_claimant(
        claims in claims_strategy(),
        master in master_strategy(),
    ) {
        let metabolites = metabolite_sheet(8);
        let metadata = metadata_sheet(&claims);
        let master = master_sheet(&master);
        let outcome = RecordMatcher::new(&metabolites, &metadata, &master).run().expect("run");
        let claimants = claimants(&claims);
        let mut seen_vials = BTreeSet::new();
        for (vial, patient) in outcome.registry.mappings() {
            prop_assert!(seen_vials.insert(vial));
            let expected: BTreeSet<u32> = [patient.get()].into();
            prop_assert_eq!(claimants.get(&vial.get()), Some(&expected));
        }
        for patient in &outcome.report.valid {
            prop_assert!(outcome.registry.vials_of(*patient).next().is_some());
        }
    }

    #[test]
    fn shared_vials_flag_every_claimant(
        claims in claims_strategy(),
        master in master_strategy(),
    ) {
        let metabolites = metabolite_sheet(8);
        let metadata = metadata_sheet(&claims);
        let master = master_sheet(&master);
        let outcome = RecordMatcher::new(&metabolites, &metadata, &master).run().expect("run");

        let claimants = claimants(&claims);
        let conflicted: BTreeSet<u32> =
            outcome.report.two_vial.iter().map(|id| id.get()).collect();
        let valid: BTreeSet<u32> = outcome.report.valid.iter().map(|id| id.get()).collect();
        let holds_unshared_vial = |patient: u32| {
            claimants
                .values()
                .any(|patients| patients.len() == 1 && patients.contains(&patient))
        };
        for patients in claimants.values().filter(|patients| patients.len() > 1) {
            for patient in patients {
                prop_assert!(conflicted.contains(patient));
                if valid.contains(patient) {
                    prop_assert!(holds_unshared_vial(*patient));
                }
            }
        }
    }
}

//! Data Assembler: joins matched records into the canonical dataset.
//!
//! Rows follow master-sheet order. Each row takes its descriptors from the
//! validating master row, its metabolite values from the first metabolite
//! row carrying the same patient id, and its phenotype from the metadata
//! claim. Valid patients with no metabolite row are reported, not dropped
//! silently.

use std::collections::BTreeMap;

use metab_ingest::{MasterSheet, MetaboliteSheet, NumericCell, classify_numeric};
use metab_model::{
    CanonicalDataset, CoercionStats, MetaboliteColumn, PatientId, PatientMeta,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::matcher::{MatchOutcome, candidate_patient};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub rows: usize,
    /// Valid patients without a metabolite row.
    pub unmatched: Vec<PatientId>,
    pub coercion: CoercionStats,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub dataset: CanonicalDataset,
    pub report: AssemblyReport,
}

/// Assembles one dataset row per valid patient that has metabolite values.
pub fn assemble(
    outcome: &MatchOutcome,
    metabolites: &MetaboliteSheet,
    master: &MasterSheet,
) -> Result<Assembly> {
    let mut first_row: BTreeMap<PatientId, usize> = BTreeMap::new();
    for (index, row) in metabolites.rows.iter().enumerate() {
        if let Some(patient) = candidate_patient(&row.patient_cell) {
            first_row.entry(patient).or_insert(index);
        }
    }

    let mut coercion = CoercionStats::default();
    let mut patients = Vec::with_capacity(outcome.validated.len());
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); metabolites.names.len()];
    let mut unmatched = Vec::new();

    for validated in &outcome.validated {
        let patient_id = validated.patient_id;
        let Some(&metabolite_index) = first_row.get(&patient_id) else {
            warn!(patient_id = %patient_id, "valid patient has no metabolite row");
            unmatched.push(patient_id);
            continue;
        };
        let source = &metabolites.rows[metabolite_index];
        for (column, raw) in columns.iter_mut().zip(&source.values) {
            coercion.cells_examined += 1;
            let cell = classify_numeric(raw);
            match cell {
                NumericCell::Value(_) => coercion.numeric += 1,
                NumericCell::Empty => coercion.empty += 1,
                NumericCell::Unparseable => coercion.coerced += 1,
            }
            column.push(cell.value());
        }
        patients.push(PatientMeta {
            patient_id,
            descriptors: master.rows[validated.master_index].descriptors.clone(),
            phenotype: outcome
                .registry
                .phenotype_of(patient_id)
                .unwrap_or_default()
                .to_string(),
        });
    }

    let metabolite_columns = metabolites
        .names
        .iter()
        .zip(columns)
        .map(|(name, values)| MetaboliteColumn::new(name.clone(), values))
        .collect();
    let dataset = CanonicalDataset::new(
        master.descriptor_names.clone(),
        patients,
        metabolite_columns,
    )?;
    let report = AssemblyReport {
        rows: dataset.row_count(),
        unmatched,
        coercion,
    };
    info!(
        rows = report.rows,
        metabolites = dataset.metabolite_count(),
        unmatched = report.unmatched.len(),
        coerced = report.coercion.coerced,
        empty = report.coercion.empty,
        "assembly complete"
    );
    Ok(Assembly { dataset, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::RecordMatcher;
    use metab_ingest::{MasterRow, MetaboliteRow, MetadataRow, MetadataSheet};
    use std::path::PathBuf;

    fn sheets() -> (MetaboliteSheet, MetadataSheet, MasterSheet) {
        let metabolites = MetaboliteSheet {
            path: PathBuf::from("metabolites.csv"),
            names: vec!["alanine".to_string(), "glycine".to_string()],
            rows: vec![
                MetaboliteRow {
                    row: 5,
                    patient_cell: "2".to_string(),
                    values: vec!["1.5".to_string(), "n.d.".to_string()],
                },
                MetaboliteRow {
                    row: 6,
                    patient_cell: "1".to_string(),
                    values: vec!["".to_string(), "4".to_string()],
                },
                MetaboliteRow {
                    row: 7,
                    patient_cell: "2".to_string(),
                    values: vec!["99".to_string(), "99".to_string()],
                },
            ],
        };
        let metadata = MetadataSheet {
            path: PathBuf::from("meta.csv"),
            rows: ["1", "2", "3"]
                .iter()
                .map(|id| MetadataRow {
                    row: 1,
                    patient_cell: (*id).to_string(),
                    vial_cell: format!("V-{id}"),
                    phenotype: "control".to_string(),
                })
                .collect(),
        };
        let master = MasterSheet {
            path: PathBuf::from("master.csv"),
            descriptor_names: vec!["Vial".to_string(), "Diagnosis".to_string()],
            rows: ["2", "1"]
                .iter()
                .map(|vial| MasterRow {
                    row: 1,
                    vial_cell: (*vial).to_string(),
                    phenotype: "Control".to_string(),
                    descriptors: vec![(*vial).to_string(), "Control".to_string()],
                })
                .collect(),
        };
        (metabolites, metadata, master)
    }

    #[test]
    fn test_rows_follow_master_order() {
        let (metabolites, metadata, master) = sheets();
        let outcome = RecordMatcher::new(&metabolites, &metadata, &master)
            .run()
            .unwrap();
        let assembly = assemble(&outcome, &metabolites, &master).unwrap();
        let ids: Vec<_> = assembly
            .dataset
            .patients()
            .iter()
            .map(|patient| patient.patient_id.get())
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(
            assembly.dataset.header(),
            vec!["ID", "Vial", "Diagnosis", "Phenotype", "alanine", "glycine"]
        );
    }

    #[test]
    fn test_first_metabolite_row_wins_and_cells_are_counted() {
        let (metabolites, metadata, master) = sheets();
        let outcome = RecordMatcher::new(&metabolites, &metadata, &master)
            .run()
            .unwrap();
        let assembly = assemble(&outcome, &metabolites, &master).unwrap();
        let alanine = assembly.dataset.metabolite("alanine").unwrap();
        assert_eq!(alanine.values, vec![Some(1.5), None]);
        assert_eq!(
            assembly.report.coercion,
            CoercionStats {
                cells_examined: 4,
                numeric: 2,
                coerced: 1,
                empty: 1,
            }
        );
    }

    #[test]
    fn test_valid_patient_without_metabolite_row_is_reported() {
        let (metabolites, metadata, master) = sheets();
        let outcome = RecordMatcher::new(&metabolites, &metadata, &master)
            .run()
            .unwrap();
        let trimmed = MetaboliteSheet {
            rows: metabolites.rows[1..2].to_vec(),
            ..metabolites
        };
        let assembly = assemble(&outcome, &trimmed, &master).unwrap();
        assert_eq!(assembly.report.unmatched, vec![PatientId::new(2)]);
        assert_eq!(assembly.report.rows, 1);
    }
}

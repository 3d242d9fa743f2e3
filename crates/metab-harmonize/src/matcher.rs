//! Record Matcher: reconciles patient identity across the three sheets.
//!
//! 1. Candidate patients are the numeric ids below
//!    [`MAX_PATIENT_ID`](metab_model::MAX_PATIENT_ID) in the metabolite sheet.
//! 2. Metadata rows for candidates claim a vial in the [`VialRegistry`].
//! 3. Master rows whose vial survived validate the vial's patient when both
//!    phenotypes agree after canonicalization. A patient holding several
//!    vials validates once, through the first master row that agrees.
//! 4. Patients still holding a vial that no master row validated are
//!    `not_in_master`.
//!
//! Rows without a counterpart are skipped, never errors.

use std::collections::BTreeSet;

use metab_ingest::{MasterSheet, MetaboliteSheet, MetadataSheet, parse_numeric};
use metab_model::{AuditReport, PatientId, VialId, canonicalize_phenotype};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{HarmonizeError, Result};
use crate::vial_registry::{Claim, VialRegistry};

/// A master row whose vial survived but whose phenotype disagreed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhenotypeMismatch {
    pub patient_id: PatientId,
    pub vial_id: VialId,
    pub metadata: String,
    pub master: String,
}

/// A master row that validated a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedRow {
    pub patient_id: PatientId,
    /// Index into [`MasterSheet::rows`].
    pub master_index: usize,
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub report: AuditReport,
    pub registry: VialRegistry,
    /// One entry per valid patient, in master order.
    pub validated: Vec<ValidatedRow>,
    pub mismatches: Vec<PhenotypeMismatch>,
    pub candidate_count: usize,
}

/// Parses a metabolite-sheet patient cell into a candidate id.
pub fn candidate_patient(cell: &str) -> Option<PatientId> {
    parse_numeric(cell).and_then(PatientId::from_numeric)
}

pub struct RecordMatcher<'a> {
    metabolites: &'a MetaboliteSheet,
    metadata: &'a MetadataSheet,
    master: &'a MasterSheet,
}

impl<'a> RecordMatcher<'a> {
    pub fn new(
        metabolites: &'a MetaboliteSheet,
        metadata: &'a MetadataSheet,
        master: &'a MasterSheet,
    ) -> Self {
        Self {
            metabolites,
            metadata,
            master,
        }
    }

    /// Candidate patient ids present in the metabolite sheet.
    pub fn candidates(&self) -> BTreeSet<PatientId> {
        self.metabolites
            .rows
            .iter()
            .filter_map(|row| {
                let candidate = candidate_patient(&row.patient_cell);
                if candidate.is_none() {
                    debug!(row = row.row, value = %row.patient_cell, "not a candidate patient id");
                }
                candidate
            })
            .collect()
    }

    /// Builds the vial registry from metadata rows of candidate patients.
    pub fn build_registry(&self, candidates: &BTreeSet<PatientId>) -> Result<VialRegistry> {
        let mut registry = VialRegistry::new();
        for row in &self.metadata.rows {
            let Some(patient) = candidate_patient(&row.patient_cell) else {
                continue;
            };
            if !candidates.contains(&patient) {
                continue;
            }
            let vial = VialId::from_compound(&row.vial_cell).ok_or_else(|| {
                HarmonizeError::InvalidVial {
                    path: self.metadata.path.clone(),
                    row: row.row,
                    value: row.vial_cell.clone(),
                }
            })?;
            let phenotype = canonicalize_phenotype(&row.phenotype);
            if registry.claim(vial, patient, &phenotype) == Claim::Conflicted {
                debug!(vial_id = %vial, patient_id = %patient, "claim rejected");
            }
        }
        Ok(registry)
    }

    pub fn run(&self) -> Result<MatchOutcome> {
        let candidates = self.candidates();
        let registry = self.build_registry(&candidates)?;

        let mut validated = Vec::new();
        let mut valid_set = BTreeSet::new();
        let mut mismatches = Vec::new();
        for (master_index, row) in self.master.rows.iter().enumerate() {
            let Some(vial) = parse_numeric(&row.vial_cell).and_then(VialId::from_numeric) else {
                debug!(row = row.row, value = %row.vial_cell, "master vial is not numeric");
                continue;
            };
            let Some(patient) = registry.patient_for(vial) else {
                continue;
            };
            if valid_set.contains(&patient) {
                continue;
            }
            let master_phenotype = canonicalize_phenotype(&row.phenotype);
            let metadata_phenotype = registry.phenotype_of(patient).unwrap_or_default();
            if master_phenotype == metadata_phenotype {
                valid_set.insert(patient);
                validated.push(ValidatedRow {
                    patient_id: patient,
                    master_index,
                });
            } else {
                debug!(
                    patient_id = %patient,
                    vial_id = %vial,
                    metadata = metadata_phenotype,
                    master = %master_phenotype,
                    "phenotype mismatch"
                );
                mismatches.push(PhenotypeMismatch {
                    patient_id: patient,
                    vial_id: vial,
                    metadata: metadata_phenotype.to_string(),
                    master: master_phenotype,
                });
            }
        }
        // A later master row may still validate a patient that mismatched first.
        mismatches.retain(|mismatch| !valid_set.contains(&mismatch.patient_id));

        let not_in_master = registry
            .holders()
            .into_iter()
            .filter(|patient| !valid_set.contains(patient))
            .collect();
        let report = AuditReport {
            valid: validated.iter().map(|row| row.patient_id).collect(),
            two_vial: registry.conflicts().to_vec(),
            not_in_master,
        };
        info!(
            candidates = candidates.len(),
            valid = report.valid.len(),
            two_vial = report.two_vial.len(),
            not_in_master = report.not_in_master.len(),
            mismatched = mismatches.len(),
            "record matching complete"
        );
        Ok(MatchOutcome {
            report,
            registry,
            validated,
            mismatches,
            candidate_count: candidates.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metab_ingest::{MasterRow, MetaboliteRow, MetadataRow};
    use std::path::PathBuf;

    fn metabolites(ids: &[&str]) -> MetaboliteSheet {
        MetaboliteSheet {
            path: PathBuf::from("metabolites.csv"),
            names: vec!["alanine".to_string()],
            rows: ids
                .iter()
                .enumerate()
                .map(|(index, id)| MetaboliteRow {
                    row: index + 5,
                    patient_cell: (*id).to_string(),
                    values: vec!["1".to_string()],
                })
                .collect(),
        }
    }

    fn metadata(rows: &[(&str, &str, &str)]) -> MetadataSheet {
        MetadataSheet {
            path: PathBuf::from("meta.csv"),
            rows: rows
                .iter()
                .enumerate()
                .map(|(index, (vial, patient, phenotype))| MetadataRow {
                    row: index + 1,
                    patient_cell: (*patient).to_string(),
                    vial_cell: (*vial).to_string(),
                    phenotype: (*phenotype).to_string(),
                })
                .collect(),
        }
    }

    fn master(rows: &[(&str, &str)]) -> MasterSheet {
        MasterSheet {
            path: PathBuf::from("master.csv"),
            descriptor_names: vec!["Vial".to_string()],
            rows: rows
                .iter()
                .enumerate()
                .map(|(index, (vial, phenotype))| MasterRow {
                    row: index + 1,
                    vial_cell: (*vial).to_string(),
                    phenotype: (*phenotype).to_string(),
                    descriptors: vec![(*vial).to_string()],
                })
                .collect(),
        }
    }

    fn ids(values: &[u32]) -> Vec<PatientId> {
        values.iter().copied().map(PatientId::new).collect()
    }

    #[test]
    fn test_candidates_reject_vial_style_ids() {
        let sheet = metabolites(&["42", "12345", "abc", "7.5", "3"]);
        let meta = metadata(&[]);
        let mast = master(&[]);
        let candidates = RecordMatcher::new(&sheet, &meta, &mast).candidates();
        assert_eq!(candidates.into_iter().collect::<Vec<_>>(), ids(&[3, 42]));
    }

    #[test]
    fn test_synonyms_validate() {
        let sheet = metabolites(&["1", "2"]);
        let meta = metadata(&[("V1", "1", "MAM"), ("V2", "2", "Marasmic Kwashiorkor")]);
        let mast = master(&[("1", "moderate acute malnutrition"), ("2", "kwashiorkor")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[1, 2]));
        assert!(outcome.report.not_in_master.is_empty());
    }

    #[test]
    fn test_mismatch_is_not_in_master() {
        let sheet = metabolites(&["1", "2"]);
        let meta = metadata(&[("V1", "1", "control"), ("V2", "2", "marasmus")]);
        let mast = master(&[("1", "control"), ("2", "kwashiorkor")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[1]));
        assert_eq!(outcome.report.not_in_master, ids(&[2]));
        assert_eq!(outcome.mismatches.len(), 1);
        assert_eq!(outcome.mismatches[0].master, "kwashiorkor");
    }

    #[test]
    fn test_conflicted_patients_never_validate() {
        let sheet = metabolites(&["1", "2", "3"]);
        let meta = metadata(&[
            ("V-5", "1", "control"),
            ("V-5", "2", "control"),
            ("V-6", "3", "control"),
        ]);
        let mast = master(&[("5", "control"), ("6", "control")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[3]));
        assert_eq!(outcome.report.two_vial, ids(&[1, 2]));
        assert!(outcome.report.not_in_master.is_empty());
    }

    #[test]
    fn test_patient_with_own_second_vial_validates() {
        let sheet = metabolites(&["1"]);
        let meta = metadata(&[("V-7", "1", "control"), ("V-8", "1", "control")]);
        let mast = master(&[("7", "control")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[1]));
        assert!(outcome.report.two_vial.is_empty());
        assert!(outcome.report.not_in_master.is_empty());
    }

    #[test]
    fn test_conflicted_patient_validates_through_unshared_vial() {
        let sheet = metabolites(&["1", "2"]);
        let meta = metadata(&[
            ("V-5", "1", "control"),
            ("V-5", "2", "control"),
            ("V-6", "1", "control"),
        ]);
        let mast = master(&[("6", "control")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[1]));
        assert_eq!(outcome.report.two_vial, ids(&[1, 2]));
        assert!(outcome.report.not_in_master.is_empty());
    }

    #[test]
    fn test_two_vials_in_master_give_one_validation() {
        let sheet = metabolites(&["1"]);
        let meta = metadata(&[("V-7", "1", "control"), ("V-8", "1", "control")]);
        let mast = master(&[("8", "control"), ("7", "control")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[1]));
        assert_eq!(outcome.validated[0].master_index, 0);
    }

    #[test]
    fn test_rows_without_counterpart_are_skipped() {
        let sheet = metabolites(&["1"]);
        let meta = metadata(&[("V1", "1", "control"), ("V9", "99", "control"), ("", "x", "")]);
        let mast = master(&[("n/a", "control"), ("8", "control"), ("1", "control")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[1]));
        assert_eq!(outcome.validated[0].master_index, 2);
    }

    #[test]
    fn test_candidate_without_vial_digits_is_fatal() {
        let sheet = metabolites(&["1"]);
        let meta = metadata(&[("pending", "1", "control")]);
        let mast = master(&[]);
        let err = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidVial { row: 1, .. }));
    }

    #[test]
    fn test_later_master_row_can_validate_after_mismatch() {
        let sheet = metabolites(&["1"]);
        let meta = metadata(&[("V1", "1", "control")]);
        let mast = master(&[("1", "marasmus"), ("1", "control")]);
        let outcome = RecordMatcher::new(&sheet, &meta, &mast).run().unwrap();
        assert_eq!(outcome.report.valid, ids(&[1]));
        assert!(outcome.mismatches.is_empty());
    }
}

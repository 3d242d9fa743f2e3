//! The canonical per-patient dataset.
//!
//! One row per validated patient. Columns are, in a fixed order, the patient
//! id, the metadata descriptors copied from the master sheet, the phenotype
//! label and the metabolite measurements. Metabolite values are stored column
//! major because every QC stage works one metabolite at a time.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::PatientId;

/// Header of the patient id column.
pub const ID_COLUMN: &str = "ID";
/// Header of the phenotype column.
pub const PHENOTYPE_COLUMN: &str = "Phenotype";

/// Non-metabolite part of a dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientMeta {
    pub patient_id: PatientId,
    /// Descriptor values aligned with [`CanonicalDataset::descriptor_names`].
    pub descriptors: Vec<String>,
    pub phenotype: String,
}

/// One metabolite column; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaboliteColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl MetaboliteColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Present values in row order.
    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|value| *value)
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_none()).count()
    }

    pub fn zero_count(&self) -> usize {
        self.present().filter(|value| *value == 0.0).count()
    }
}

/// Flat table shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDataset {
    descriptor_names: Vec<String>,
    patients: Vec<PatientMeta>,
    metabolites: Vec<MetaboliteColumn>,
}

impl CanonicalDataset {
    /// Builds a dataset, checking column lengths and name uniqueness.
    pub fn new(
        descriptor_names: Vec<String>,
        patients: Vec<PatientMeta>,
        metabolites: Vec<MetaboliteColumn>,
    ) -> Result<Self> {
        let mut seen = BTreeSet::from([ID_COLUMN.to_string(), PHENOTYPE_COLUMN.to_string()]);
        for name in descriptor_names
            .iter()
            .chain(metabolites.iter().map(|column| &column.name))
        {
            if !seen.insert(name.clone()) {
                return Err(ModelError::DuplicateColumn(name.clone()));
            }
        }
        for patient in &patients {
            if patient.descriptors.len() != descriptor_names.len() {
                return Err(ModelError::ColumnLength {
                    column: format!("descriptors of patient {}", patient.patient_id),
                    expected: descriptor_names.len(),
                    actual: patient.descriptors.len(),
                });
            }
        }
        let dataset = Self {
            descriptor_names,
            patients,
            metabolites,
        };
        dataset.check_lengths(&dataset.metabolites)?;
        Ok(dataset)
    }

    fn check_lengths(&self, columns: &[MetaboliteColumn]) -> Result<()> {
        for column in columns {
            if column.values.len() != self.patients.len() {
                return Err(ModelError::ColumnLength {
                    column: column.name.clone(),
                    expected: self.patients.len(),
                    actual: column.values.len(),
                });
            }
        }
        Ok(())
    }

    pub fn descriptor_names(&self) -> &[String] {
        &self.descriptor_names
    }

    pub fn patients(&self) -> &[PatientMeta] {
        &self.patients
    }

    pub fn metabolites(&self) -> &[MetaboliteColumn] {
        &self.metabolites
    }

    /// Mutable access to metabolite values; column lengths must not change.
    pub fn metabolites_mut(&mut self) -> &mut [MetaboliteColumn] {
        &mut self.metabolites
    }

    pub fn metabolite(&self, name: &str) -> Option<&MetaboliteColumn> {
        self.metabolites.iter().find(|column| column.name == name)
    }

    pub fn metabolite_names(&self) -> Vec<&str> {
        self.metabolites
            .iter()
            .map(|column| column.name.as_str())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.patients.len()
    }

    pub fn metabolite_count(&self) -> usize {
        self.metabolites.len()
    }

    /// Total number of missing metabolite cells.
    pub fn missing_count(&self) -> usize {
        self.metabolites
            .iter()
            .map(MetaboliteColumn::missing_count)
            .sum()
    }

    /// Full header in output order.
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(2 + self.descriptor_names.len() + self.metabolites.len());
        header.push(ID_COLUMN.to_string());
        header.extend(self.descriptor_names.iter().cloned());
        header.push(PHENOTYPE_COLUMN.to_string());
        header.extend(self.metabolites.iter().map(|column| column.name.clone()));
        header
    }

    /// Keeps metabolite columns for which `keep` returns true.
    ///
    /// Returns the names of removed columns in their original order.
    pub fn retain_metabolites<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&MetaboliteColumn) -> bool,
    {
        let mut removed = Vec::new();
        self.metabolites.retain(|column| {
            let kept = keep(column);
            if !kept {
                removed.push(column.name.clone());
            }
            kept
        });
        removed
    }

    /// Keeps rows whose mask entry is true, metadata and metabolites alike.
    ///
    /// Row order is preserved. Returns the removed patient ids.
    pub fn retain_rows(&mut self, mask: &[bool]) -> Result<Vec<PatientId>> {
        if mask.len() != self.patients.len() {
            return Err(ModelError::ColumnLength {
                column: "row mask".to_string(),
                expected: self.patients.len(),
                actual: mask.len(),
            });
        }
        let removed = self
            .patients
            .iter()
            .zip(mask)
            .filter(|(_, keep)| !**keep)
            .map(|(patient, _)| patient.patient_id)
            .collect();
        let mut flags = mask.iter();
        self.patients.retain(|_| flags.next().copied().unwrap_or(false));
        for column in &mut self.metabolites {
            let mut flags = mask.iter();
            column
                .values
                .retain(|_| flags.next().copied().unwrap_or(false));
        }
        Ok(removed)
    }

    /// Replaces the metabolite columns, keeping the patient rows.
    pub fn with_metabolites(&self, metabolites: Vec<MetaboliteColumn>) -> Result<Self> {
        Self::new(
            self.descriptor_names.clone(),
            self.patients.clone(),
            metabolites,
        )
    }

    /// Rewrites every phenotype label; rows mapped to `None` are dropped.
    pub fn relabel_phenotypes<F>(&self, mut relabel: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let labels: Vec<Option<String>> = self
            .patients
            .iter()
            .map(|patient| relabel(&patient.phenotype))
            .collect();
        let mask: Vec<bool> = labels.iter().map(Option::is_some).collect();
        let mut relabelled = self.clone();
        for (patient, label) in relabelled.patients.iter_mut().zip(&labels) {
            if let Some(label) = label {
                patient.phenotype.clone_from(label);
            }
        }
        relabelled.retain_rows(&mask)?;
        Ok(relabelled)
    }

    /// Distinct phenotype labels in first-encounter order.
    pub fn phenotype_labels(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.patients
            .iter()
            .map(|patient| patient.phenotype.as_str())
            .filter(|label| seen.insert(*label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: u32, phenotype: &str) -> PatientMeta {
        PatientMeta {
            patient_id: PatientId::new(id),
            descriptors: vec![format!("{}", id + 100)],
            phenotype: phenotype.to_string(),
        }
    }

    fn dataset() -> CanonicalDataset {
        CanonicalDataset::new(
            vec!["SUBJECTID".to_string()],
            vec![patient(1, "control"), patient(2, "kwashiorkor"), patient(3, "control")],
            vec![
                MetaboliteColumn::new("alanine", vec![Some(1.0), None, Some(3.0)]),
                MetaboliteColumn::new("glycine", vec![Some(0.0), Some(0.0), Some(2.0)]),
            ],
        )
        .expect("valid dataset")
    }

    #[test]
    fn test_header_order() {
        assert_eq!(
            dataset().header(),
            vec!["ID", "SUBJECTID", "Phenotype", "alanine", "glycine"]
        );
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let result = CanonicalDataset::new(
            vec![],
            vec![PatientMeta {
                patient_id: PatientId::new(1),
                descriptors: vec![],
                phenotype: "control".to_string(),
            }],
            vec![MetaboliteColumn::new("alanine", vec![Some(1.0), Some(2.0)])],
        );
        assert!(matches!(result, Err(ModelError::ColumnLength { .. })));
    }

    #[test]
    fn test_rejects_reserved_name() {
        let result = CanonicalDataset::new(
            vec![],
            vec![],
            vec![MetaboliteColumn::new("Phenotype", vec![])],
        );
        assert!(matches!(result, Err(ModelError::DuplicateColumn(name)) if name == "Phenotype"));
    }

    #[test]
    fn test_retain_rows_keeps_alignment() {
        let mut data = dataset();
        let removed = data.retain_rows(&[true, false, true]).expect("mask");
        assert_eq!(removed, vec![PatientId::new(2)]);
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.patients()[1].patient_id, PatientId::new(3));
        assert_eq!(data.metabolites()[0].values, vec![Some(1.0), Some(3.0)]);
        assert_eq!(data.metabolites()[1].values, vec![Some(0.0), Some(2.0)]);
    }

    #[test]
    fn test_retain_metabolites_reports_removed() {
        let mut data = dataset();
        let removed = data.retain_metabolites(|column| column.zero_count() == 0);
        assert_eq!(removed, vec!["glycine"]);
        assert_eq!(data.metabolite_names(), vec!["alanine"]);
    }

    #[test]
    fn test_relabel_drops_unmapped_rows() {
        let data = dataset();
        let grouped = data
            .relabel_phenotypes(|label| (label == "control").then(|| "Healthy".to_string()))
            .expect("relabel");
        assert_eq!(grouped.row_count(), 2);
        assert_eq!(grouped.phenotype_labels(), vec!["Healthy"]);
    }
}

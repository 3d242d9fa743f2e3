//! Vial → patient mapping with conflict eviction.
//!
//! A vial maps to at most one patient; a patient may hold several vials.
//! A second distinct patient claiming a vial goes through
//! [`VialRegistry::record_conflict`], which evicts the vial, taints it and
//! records both patients. A tainted vial stays tainted, so the surviving
//! mappings depend only on the set of claims and never on their order.
//! Losing a shared vial does not stop a patient from validating through
//! another vial it holds alone.
//!
//! Every claim restates the patient's phenotype and the last statement
//! wins, as a later metadata row overrides an earlier one.

use std::collections::{BTreeMap, BTreeSet};

use metab_model::{PatientId, VialId};
use tracing::debug;

/// Result of a single [`VialRegistry::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// A new vial → patient mapping was recorded.
    Mapped,
    /// The same patient claimed the same vial again; nothing changed.
    Repeated,
    /// The vial belongs to another patient or is already tainted.
    Conflicted,
}

#[derive(Debug, Clone, Default)]
pub struct VialRegistry {
    by_vial: BTreeMap<VialId, PatientId>,
    phenotypes: BTreeMap<PatientId, String>,
    tainted_vials: BTreeSet<VialId>,
    conflicted: BTreeSet<PatientId>,
    conflicts: Vec<PatientId>,
    /// Vials in the order they were first mapped.
    claim_order: Vec<VialId>,
}

impl VialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `patient` owns `vial`, with the phenotype stated by the
    /// claiming row.
    pub fn claim(&mut self, vial: VialId, patient: PatientId, phenotype: &str) -> Claim {
        self.phenotypes.insert(patient, phenotype.to_string());
        match self.by_vial.get(&vial) {
            Some(holder) if *holder == patient => return Claim::Repeated,
            Some(_) => {}
            None if !self.tainted_vials.contains(&vial) => {
                self.by_vial.insert(vial, patient);
                self.claim_order.push(vial);
                return Claim::Mapped;
            }
            None => {}
        }
        self.record_conflict(vial, patient);
        Claim::Conflicted
    }

    /// Evicts the mapping of `vial`, taints it and flags both its holder
    /// and `patient`.
    ///
    /// The previous holder of the vial is recorded before the claimant.
    pub fn record_conflict(&mut self, vial: VialId, patient: PatientId) {
        if let Some(holder) = self.by_vial.remove(&vial) {
            self.flag(holder);
        }
        self.tainted_vials.insert(vial);
        self.flag(patient);
        debug!(vial_id = %vial, patient_id = %patient, "vial conflict");
    }

    fn flag(&mut self, patient: PatientId) {
        if self.conflicted.insert(patient) {
            self.conflicts.push(patient);
        }
    }

    pub fn patient_for(&self, vial: VialId) -> Option<PatientId> {
        self.by_vial.get(&vial).copied()
    }

    /// Surviving vials held by `patient`, in mapping order.
    pub fn vials_of(&self, patient: PatientId) -> impl Iterator<Item = VialId> + '_ {
        self.mappings()
            .filter(move |(_, holder)| *holder == patient)
            .map(|(vial, _)| vial)
    }

    /// Phenotype stated by the patient's latest claim.
    pub fn phenotype_of(&self, patient: PatientId) -> Option<&str> {
        self.phenotypes.get(&patient).map(String::as_str)
    }

    /// Whether `patient` took part in any vial conflict.
    pub fn is_conflicted(&self, patient: PatientId) -> bool {
        self.conflicted.contains(&patient)
    }

    pub fn is_tainted(&self, vial: VialId) -> bool {
        self.tainted_vials.contains(&vial)
    }

    /// Patients involved in any conflict, in the order they were flagged.
    pub fn conflicts(&self) -> &[PatientId] {
        &self.conflicts
    }

    /// Surviving mappings in the order their vials were first claimed.
    pub fn mappings(&self) -> impl Iterator<Item = (VialId, PatientId)> + '_ {
        self.claim_order
            .iter()
            .filter_map(|vial| self.by_vial.get(vial).map(|patient| (*vial, *patient)))
    }

    /// Patients holding at least one surviving vial, each listed once.
    pub fn holders(&self) -> Vec<PatientId> {
        let mut seen = BTreeSet::new();
        self.mappings()
            .map(|(_, patient)| patient)
            .filter(|patient| seen.insert(*patient))
            .collect()
    }

    /// Number of surviving mappings.
    pub fn len(&self) -> usize {
        self.by_vial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_vial.is_empty()
    }
}

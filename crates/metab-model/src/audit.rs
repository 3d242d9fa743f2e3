//! Matching and assembly audit records.

use serde::{Deserialize, Serialize};

use crate::ids::PatientId;

/// Three labelled patient lists produced by record matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// In master with one vial and a matching phenotype.
    pub valid: Vec<PatientId>,
    /// Involved in a vial conflict and excluded.
    pub two_vial: Vec<PatientId>,
    /// Mapped to a surviving vial but not validated against master.
    pub not_in_master: Vec<PatientId>,
}

/// Cell-level statistics gathered while assembling metabolite values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionStats {
    /// Metabolite cells read for assembled rows.
    pub cells_examined: usize,
    /// Cells that parsed as numbers.
    pub numeric: usize,
    /// Non-empty cells that did not parse and became missing.
    pub coerced: usize,
    /// Empty cells.
    pub empty: usize,
}

impl CoercionStats {
    pub fn missing(&self) -> usize {
        self.coerced + self.empty
    }
}

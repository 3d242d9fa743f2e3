//! Patient and vial identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) for a metabolite-sheet patient id.
///
/// Larger numbers in the patient column are mis-parsed vial-style ids.
pub const MAX_PATIENT_ID: u32 = 10_000;

/// Patient identifier taken from the metabolite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(u32);

impl PatientId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Accepts a numeric cell as a candidate patient id.
    ///
    /// The value must be finite, non-negative, integral and below
    /// [`MAX_PATIENT_ID`].
    pub fn from_numeric(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return None;
        }
        if value >= f64::from(MAX_PATIENT_ID) {
            return None;
        }
        Some(Self(value as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Laboratory sample-tube identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VialId(u64);

impl VialId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parses a compound vial string by keeping only its ASCII digits.
    ///
    /// `"V-007"` becomes vial 7. Returns `None` when no digits remain or the
    /// digits overflow.
    pub fn from_compound(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        digits.parse::<u64>().ok().map(Self)
    }

    /// Accepts a numeric master-sheet cell as a vial id.
    pub fn from_numeric(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
            return None;
        }
        Some(Self(value as u64))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_id_bounds() {
        assert_eq!(PatientId::from_numeric(42.0), Some(PatientId::new(42)));
        assert_eq!(PatientId::from_numeric(9999.0), Some(PatientId::new(9999)));
        assert_eq!(PatientId::from_numeric(10_000.0), None);
        assert_eq!(PatientId::from_numeric(12_345.0), None);
        assert_eq!(PatientId::from_numeric(-1.0), None);
        assert_eq!(PatientId::from_numeric(4.5), None);
        assert_eq!(PatientId::from_numeric(f64::NAN), None);
    }

    #[test]
    fn test_vial_from_compound() {
        assert_eq!(VialId::from_compound("V-007"), Some(VialId::new(7)));
        assert_eq!(VialId::from_compound("MAL 12-B3"), Some(VialId::new(123)));
        assert_eq!(VialId::from_compound("no digits"), None);
        assert_eq!(VialId::from_compound(""), None);
    }

    #[test]
    fn test_vial_from_numeric() {
        assert_eq!(VialId::from_numeric(7.0), Some(VialId::new(7)));
        assert_eq!(VialId::from_numeric(7.25), None);
    }
}

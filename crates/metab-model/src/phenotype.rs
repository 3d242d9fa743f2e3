//! Phenotype labels and canonicalization.
//!
//! Metadata and master sheets spell the same diagnosis differently ("MAM"
//! vs "moderate acute malnutrition", "marasmic kwashiorkor" vs
//! "kwashiorkor"). Both sides of every comparison go through
//! [`canonicalize_phenotype`], so one table decides equality.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Synonym table applied after lower-casing and whitespace collapsing.
const SYNONYMS: &[(&str, &str)] = &[
    ("mam", "moderate acute malnutrition"),
    ("marasmic kwashiorkor", "kwashiorkor"),
    ("marasmus kwashiorkor", "kwashiorkor"),
];

/// Clinical malnutrition classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phenotype {
    Control,
    Mam,
    Marasmus,
    Kwashiorkor,
}

impl Phenotype {
    pub const ALL: [Phenotype; 4] = [
        Phenotype::Control,
        Phenotype::Mam,
        Phenotype::Marasmus,
        Phenotype::Kwashiorkor,
    ];

    /// Canonical lower-case label as written to the dataset.
    pub fn label(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Mam => "moderate acute malnutrition",
            Self::Marasmus => "marasmus",
            Self::Kwashiorkor => "kwashiorkor",
        }
    }

    /// Parses a raw label through the canonicalization table.
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = canonicalize_phenotype(raw);
        Self::ALL
            .into_iter()
            .find(|phenotype| phenotype.label() == canonical)
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns the canonical form of a raw phenotype label.
///
/// Labels outside the closed set are returned lower-cased with collapsed
/// whitespace so they still compare consistently.
pub fn canonicalize_phenotype(raw: &str) -> String {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == normalized)
        .map_or(normalized, |(_, canonical)| (*canonical).to_string())
}

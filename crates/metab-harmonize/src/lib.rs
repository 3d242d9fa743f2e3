//! Patient-record harmonization.
//!
//! [`harmonize`] runs the [`RecordMatcher`] and then [`assemble`] over the
//! three loaded source sheets, producing the canonical dataset and its audit
//! trail. Nothing is written here; persisting is the caller's job.

pub mod assembler;
pub mod error;
pub mod matcher;
pub mod vial_registry;

use std::time::Instant;

use metab_ingest::{MasterSheet, MetaboliteSheet, MetadataSheet};
use tracing::{debug, info_span};

pub use assembler::{Assembly, AssemblyReport, assemble};
pub use error::{HarmonizeError, Result};
pub use matcher::{MatchOutcome, PhenotypeMismatch, RecordMatcher, ValidatedRow, candidate_patient};
pub use vial_registry::{Claim, VialRegistry};

/// The three source sheets of one study.
#[derive(Debug, Clone, Copy)]
pub struct SourceSheets<'a> {
    pub metabolites: &'a MetaboliteSheet,
    pub metadata: &'a MetadataSheet,
    pub master: &'a MasterSheet,
}

#[derive(Debug, Clone)]
pub struct Harmonized {
    pub matched: MatchOutcome,
    pub assembly: Assembly,
}

/// Matches records across the sheets and assembles the canonical dataset.
pub fn harmonize(sources: SourceSheets<'_>) -> Result<Harmonized> {
    let _guard = info_span!("harmonize").entered();
    let matched = info_span!("match").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let outcome =
            RecordMatcher::new(sources.metabolites, sources.metadata, sources.master).run()?;
        debug!(duration_ms = start.elapsed().as_millis(), "match complete");
        Ok(outcome)
    })?;
    let assembly = info_span!("assemble").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let assembly = assemble(&matched, sources.metabolites, sources.master)?;
        debug!(duration_ms = start.elapsed().as_millis(), "assemble complete");
        Ok(assembly)
    })?;
    Ok(Harmonized { matched, assembly })
}

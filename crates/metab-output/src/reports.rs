//! Fixed-format text artifacts.
//!
//! Each renderer returns the full file contents so a run can stage every
//! artifact in memory before anything touches the output directory.

use std::fmt::{self, Write as _};

use metab_harmonize::{AssemblyReport, PhenotypeMismatch};
use metab_model::{AuditReport, ChangeLog, PatientId};
use metab_qc::{FilterEntry, FilterLog, NormalitySummary};

use crate::error::Result;

fn write_ids(out: &mut String, ids: &[PatientId]) -> fmt::Result {
    ids.iter().try_for_each(|id| writeln!(out, "{id}"))
}

fn render(body: impl FnOnce(&mut String) -> fmt::Result) -> Result<String> {
    let mut out = String::new();
    body(&mut out)?;
    Ok(out)
}

/// `patients_summary.txt`: the three labelled patient lists.
///
/// Phenotype mismatches get a trailing section when there are any; those
/// patients are also listed under "Patients not in master".
pub fn render_audit_report(
    report: &AuditReport,
    mismatches: &[PhenotypeMismatch],
) -> Result<String> {
    render(|out| {
        writeln!(out, "Patients in master with one vial and matching phenotypes")?;
        write_ids(out, &report.valid)?;
        writeln!(out, "\nPatients with two vials")?;
        write_ids(out, &report.two_vial)?;
        writeln!(out, "\nPatients not in master")?;
        write_ids(out, &report.not_in_master)?;
        if !mismatches.is_empty() {
            writeln!(out, "\nPatients with mismatched phenotypes")?;
            for mismatch in mismatches {
                writeln!(
                    out,
                    "{} (vial {}): metadata '{}', master '{}'",
                    mismatch.patient_id, mismatch.vial_id, mismatch.metadata, mismatch.master
                )?;
            }
        }
        Ok(())
    })
}

/// `data_cleanup_stats.txt`: cell coercion counts from assembly and the
/// number of values the outlier cap moved.
pub fn render_cleanup_stats(report: &AssemblyReport, outliers_corrected: usize) -> Result<String> {
    let coercion = &report.coercion;
    render(|out| {
        writeln!(out, "Total number of data points examined: {}", coercion.cells_examined)?;
        writeln!(out, "Total numeric entries: {}", coercion.numeric)?;
        writeln!(out, "Total non-numeric entries corrected: {}", coercion.coerced)?;
        writeln!(out, "Total empty entries: {}", coercion.empty)?;
        writeln!(out, "Total outliers corrected: {outliers_corrected}")?;
        writeln!(out, "Rows assembled: {}", report.rows)?;
        writeln!(
            out,
            "Valid patients without metabolite data: {}",
            report.unmatched.len()
        )?;
        write_ids(out, &report.unmatched)
    })
}

/// `changes_log.txt`: one line per change-log entry.
pub fn render_change_log(log: &ChangeLog) -> String {
    let mut out = String::new();
    for entry in log.entries() {
        out.push_str(entry);
        out.push('\n');
    }
    out
}

/// `filter_log.txt`: numbered filter steps with the removed metabolites.
pub fn render_filter_log(log: &FilterLog) -> Result<String> {
    render(|out| {
        writeln!(out, "Original number of metabolites: {}\n", log.original_count)?;
        let mut step = 1;
        for entry in &log.entries {
            match entry {
                FilterEntry::Step { summary, removed } => {
                    writeln!(out, "\nStep {step}: {summary}")?;
                    step += 1;
                    for name in removed {
                        writeln!(out, "{name}")?;
                    }
                }
                FilterEntry::Note(note) => writeln!(out, "{note}")?,
            }
        }
        writeln!(out, "\nFinal number of metabolites: {}", log.final_count)
    })
}

fn format_p(p_value: Option<f64>) -> String {
    p_value.map_or_else(|| "n/a".to_string(), |p| format!("{p:.5}"))
}

/// `normality_summary.txt`: pass/fail counts and the affected columns.
pub fn render_normality_summary(summary: &NormalitySummary) -> Result<String> {
    render(|out| {
        writeln!(out, "Normality threshold: {}", summary.threshold)?;
        writeln!(out, "Action for non-normal metabolites: {}", summary.action)?;
        writeln!(out, "Metabolites tested: {}", summary.tested)?;
        writeln!(out, "Metabolites with too few values to test: {}", summary.untested)?;
        writeln!(out, "Non-normal before transformation: {}", summary.failing_before)?;
        writeln!(out, "Non-normal after transformation: {}", summary.failing_after)?;

        let transformed: Vec<_> = summary.columns.iter().filter(|c| c.transformed).collect();
        if !transformed.is_empty() {
            writeln!(out, "\nTransformed metabolites")?;
            for column in transformed {
                writeln!(
                    out,
                    "{}: p-value = {} -> {}",
                    column.name,
                    format_p(column.p_value),
                    format_p(column.p_value_after)
                )?;
            }
        }
        let dropped: Vec<_> = summary.columns.iter().filter(|c| c.dropped).collect();
        if !dropped.is_empty() {
            writeln!(out, "\nDropped metabolites")?;
            for column in dropped {
                writeln!(out, "{}: p-value = {}", column.name, format_p(column.p_value))?;
            }
        }
        Ok(())
    })
}

//! Typed loaders for the four source sheets.
//!
//! Each loader reads the raw grid, validates it against its schema descriptor
//! and extracts only the cells that descriptor names. Cell interpretation
//! (numeric ids, vial digits, phenotype canonicalization) is left to the
//! matcher so coercion can be counted in one place.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use metab_model::MetaboliteColumn;
use tracing::debug;

use crate::cell::parse_numeric;
use crate::error::{IngestError, Result};
use crate::schema::{MasterSheetSchema, MetaboliteSheetSchema, MetadataSheetSchema, QcSheetSchema};
use crate::sheet::{RawSheet, read_sheet};

/// Data row of the metabolite sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaboliteRow {
    /// Zero-based row index in the source grid.
    pub row: usize,
    pub patient_cell: String,
    /// Raw metabolite cells aligned with [`MetaboliteSheet::names`].
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MetaboliteSheet {
    pub path: PathBuf,
    pub names: Vec<String>,
    pub rows: Vec<MetaboliteRow>,
}

/// Data row of the metadata sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub row: usize,
    pub patient_cell: String,
    pub vial_cell: String,
    pub phenotype: String,
}

#[derive(Debug, Clone)]
pub struct MetadataSheet {
    pub path: PathBuf,
    pub rows: Vec<MetadataRow>,
}

/// Data row of the master sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterRow {
    pub row: usize,
    pub vial_cell: String,
    pub phenotype: String,
    /// The leading descriptor cells, vial column included.
    pub descriptors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MasterSheet {
    pub path: PathBuf,
    pub descriptor_names: Vec<String>,
    pub rows: Vec<MasterRow>,
}

/// Pooled QC measurements, one column per metabolite.
#[derive(Debug, Clone)]
pub struct QcSheet {
    pub path: PathBuf,
    pub columns: Vec<MetaboliteColumn>,
}

impl QcSheet {
    pub fn column(&self, name: &str) -> Option<&MetaboliteColumn> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Metabolite names from `first` onward; trailing blanks are trimmed and
/// interior blanks or duplicates violate the layout.
fn metabolite_names(
    sheet: &'static str,
    raw: &RawSheet,
    row: usize,
    first: usize,
) -> Result<Vec<String>> {
    let mut names: Vec<String> = (first..raw.width(row))
        .map(|column| raw.cell(row, column).to_string())
        .collect();
    while names.last().is_some_and(String::is_empty) {
        names.pop();
    }
    if names.is_empty() {
        return Err(IngestError::SchemaViolation {
            sheet,
            path: raw.path.clone(),
            reason: format!("no metabolite names in row {row} from column {first}"),
        });
    }
    let mut seen = BTreeSet::new();
    for (offset, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(IngestError::SchemaViolation {
                sheet,
                path: raw.path.clone(),
                reason: format!("blank metabolite name in column {}", first + offset),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(IngestError::SchemaViolation {
                sheet,
                path: raw.path.clone(),
                reason: format!("duplicate metabolite name '{name}'"),
            });
        }
    }
    Ok(names)
}

fn data_rows(raw: &RawSheet, start: usize) -> impl Iterator<Item = usize> + '_ {
    (start..raw.row_count()).filter(|row| !raw.is_blank_row(*row))
}

/// Loads the metabolite measurement sheet.
pub fn load_metabolite_sheet(path: &Path, schema: &MetaboliteSheetSchema) -> Result<MetaboliteSheet> {
    let raw = read_sheet(path)?;
    schema.validate(&raw)?;
    let names = metabolite_names(
        MetaboliteSheetSchema::SHEET,
        &raw,
        schema.name_row,
        schema.first_metabolite_column,
    )?;
    let rows: Vec<MetaboliteRow> = data_rows(&raw, schema.data_start_row)
        .map(|row| MetaboliteRow {
            row,
            patient_cell: raw.cell(row, schema.patient_id_column).to_string(),
            values: (0..names.len())
                .map(|offset| {
                    raw.cell(row, schema.first_metabolite_column + offset)
                        .to_string()
                })
                .collect(),
        })
        .collect();
    debug!(
        path = %path.display(),
        metabolites = names.len(),
        rows = rows.len(),
        "loaded metabolite sheet"
    );
    Ok(MetaboliteSheet {
        path: raw.path,
        names,
        rows,
    })
}

/// Loads the metadata / phenotype sheet.
pub fn load_metadata_sheet(path: &Path, schema: &MetadataSheetSchema) -> Result<MetadataSheet> {
    let raw = read_sheet(path)?;
    schema.validate(&raw)?;
    let rows: Vec<MetadataRow> = data_rows(&raw, schema.data_start_row)
        .map(|row| MetadataRow {
            row,
            patient_cell: raw.cell(row, schema.patient_id_column).to_string(),
            vial_cell: raw.cell(row, schema.vial_column).to_string(),
            phenotype: raw.cell(row, schema.phenotype_column).to_string(),
        })
        .collect();
    debug!(path = %path.display(), rows = rows.len(), "loaded metadata sheet");
    Ok(MetadataSheet {
        path: raw.path,
        rows,
    })
}

/// Loads the master validation sheet.
///
/// Blank descriptor headers are named `Unnamed: <column>`.
pub fn load_master_sheet(path: &Path, schema: &MasterSheetSchema) -> Result<MasterSheet> {
    let raw = read_sheet(path)?;
    schema.validate(&raw)?;
    let descriptor_names: Vec<String> = (0..schema.descriptor_count)
        .map(|column| match raw.cell(schema.header_row, column) {
            "" => format!("Unnamed: {column}"),
            name => name.to_string(),
        })
        .collect();
    let rows: Vec<MasterRow> = data_rows(&raw, schema.data_start_row)
        .map(|row| MasterRow {
            row,
            vial_cell: raw.cell(row, schema.vial_column).to_string(),
            phenotype: raw.cell(row, schema.phenotype_column).to_string(),
            descriptors: (0..schema.descriptor_count)
                .map(|column| raw.cell(row, column).to_string())
                .collect(),
        })
        .collect();
    debug!(path = %path.display(), rows = rows.len(), "loaded master sheet");
    Ok(MasterSheet {
        path: raw.path,
        descriptor_names,
        rows,
    })
}

/// Loads the pooled QC sheet; unparseable cells become missing.
pub fn load_qc_sheet(path: &Path, schema: &QcSheetSchema) -> Result<QcSheet> {
    let raw = read_sheet(path)?;
    schema.validate(&raw)?;
    let names = metabolite_names(
        QcSheetSchema::SHEET,
        &raw,
        schema.header_row,
        schema.first_metabolite_column,
    )?;
    let rows: Vec<usize> = data_rows(&raw, schema.data_start_row).collect();
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(offset, name)| {
            let column = schema.first_metabolite_column + offset;
            let values = rows
                .iter()
                .map(|row| parse_numeric(raw.cell(*row, column)))
                .collect();
            MetaboliteColumn::new(name, values)
        })
        .collect::<Vec<_>>();
    debug!(
        path = %path.display(),
        metabolites = columns.len(),
        samples = rows.len(),
        "loaded qc sheet"
    );
    Ok(QcSheet {
        path: raw.path,
        columns,
    })
}

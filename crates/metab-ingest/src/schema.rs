//! Positional layout descriptors for the source sheets.
//!
//! Each sheet type declares its header rows and key-column indices once.
//! [`validate`](MetaboliteSheetSchema::validate) checks the declaration
//! against the loaded grid before any cell is interpreted, so access sites
//! never re-assume offsets.

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::sheet::RawSheet;

fn violation(sheet: &'static str, raw: &RawSheet, reason: String) -> IngestError {
    IngestError::SchemaViolation {
        sheet,
        path: raw.path.clone(),
        reason,
    }
}

fn require_row(sheet: &'static str, raw: &RawSheet, row: usize, what: &str) -> Result<()> {
    if row >= raw.row_count() {
        return Err(violation(
            sheet,
            raw,
            format!("{what} row {row} is missing ({} rows read)", raw.row_count()),
        ));
    }
    Ok(())
}

fn require_width(sheet: &'static str, raw: &RawSheet, row: usize, width: usize) -> Result<()> {
    if raw.width(row) < width {
        return Err(violation(
            sheet,
            raw,
            format!(
                "header row {row} has {} columns, at least {width} expected",
                raw.width(row)
            ),
        ));
    }
    Ok(())
}

/// Metabolite measurement sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaboliteSheetSchema {
    /// Row holding metabolite names.
    pub name_row: usize,
    /// First patient row; rows above it are header material.
    pub data_start_row: usize,
    pub patient_id_column: usize,
    /// Metabolite values occupy this column and every column after it.
    pub first_metabolite_column: usize,
}

impl Default for MetaboliteSheetSchema {
    fn default() -> Self {
        Self {
            name_row: 0,
            data_start_row: 5,
            patient_id_column: 1,
            first_metabolite_column: 7,
        }
    }
}

impl MetaboliteSheetSchema {
    pub const SHEET: &'static str = "metabolite";

    pub fn validate(&self, raw: &RawSheet) -> Result<()> {
        if self.data_start_row <= self.name_row {
            return Err(violation(
                Self::SHEET,
                raw,
                "data rows must start below the name row".to_string(),
            ));
        }
        if self.patient_id_column >= self.first_metabolite_column {
            return Err(violation(
                Self::SHEET,
                raw,
                "patient id column must precede the metabolite columns".to_string(),
            ));
        }
        require_row(Self::SHEET, raw, self.name_row, "name")?;
        require_width(Self::SHEET, raw, self.name_row, self.first_metabolite_column + 1)
    }
}

/// Metadata / phenotype assignment sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSheetSchema {
    pub data_start_row: usize,
    /// Compound vial string with the vial digits embedded.
    pub vial_column: usize,
    pub patient_id_column: usize,
    pub phenotype_column: usize,
}

impl Default for MetadataSheetSchema {
    fn default() -> Self {
        Self {
            data_start_row: 1,
            vial_column: 0,
            patient_id_column: 2,
            phenotype_column: 7,
        }
    }
}

impl MetadataSheetSchema {
    pub const SHEET: &'static str = "metadata";

    fn width(&self) -> usize {
        self.vial_column
            .max(self.patient_id_column)
            .max(self.phenotype_column)
            + 1
    }

    pub fn validate(&self, raw: &RawSheet) -> Result<()> {
        if self.data_start_row == 0 {
            return Err(violation(
                Self::SHEET,
                raw,
                "a header row must precede the data rows".to_string(),
            ));
        }
        require_row(Self::SHEET, raw, 0, "header")?;
        require_width(Self::SHEET, raw, 0, self.width())
    }
}

/// Master validation sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterSheetSchema {
    pub header_row: usize,
    pub data_start_row: usize,
    pub vial_column: usize,
    pub phenotype_column: usize,
    /// Leading columns copied into the dataset as metadata descriptors.
    pub descriptor_count: usize,
}

impl Default for MasterSheetSchema {
    fn default() -> Self {
        Self {
            header_row: 0,
            data_start_row: 1,
            vial_column: 0,
            phenotype_column: 1,
            descriptor_count: 7,
        }
    }
}

impl MasterSheetSchema {
    pub const SHEET: &'static str = "master";

    pub fn validate(&self, raw: &RawSheet) -> Result<()> {
        if self.data_start_row <= self.header_row {
            return Err(violation(
                Self::SHEET,
                raw,
                "data rows must start below the header row".to_string(),
            ));
        }
        let width = self
            .descriptor_count
            .max(self.vial_column + 1)
            .max(self.phenotype_column + 1);
        require_row(Self::SHEET, raw, self.header_row, "header")?;
        require_width(Self::SHEET, raw, self.header_row, width)
    }
}

/// Pooled quality-control sample sheet used by the RSD filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcSheetSchema {
    pub header_row: usize,
    pub data_start_row: usize,
    pub first_metabolite_column: usize,
}

impl Default for QcSheetSchema {
    fn default() -> Self {
        Self {
            header_row: 0,
            data_start_row: 1,
            first_metabolite_column: 7,
        }
    }
}

impl QcSheetSchema {
    pub const SHEET: &'static str = "qc";

    pub fn validate(&self, raw: &RawSheet) -> Result<()> {
        if self.data_start_row <= self.header_row {
            return Err(violation(
                Self::SHEET,
                raw,
                "data rows must start below the header row".to_string(),
            ));
        }
        require_row(Self::SHEET, raw, self.header_row, "header")?;
        require_width(Self::SHEET, raw, self.header_row, self.first_metabolite_column + 1)
    }
}

/// Layout of every source sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchemas {
    pub metabolite: MetaboliteSheetSchema,
    pub metadata: MetadataSheetSchema,
    pub master: MasterSheetSchema,
    pub qc: QcSheetSchema,
}

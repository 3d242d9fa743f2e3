//! Reading a previously written canonical dataset back in.

use std::path::Path;

use csv::ReaderBuilder;
use metab_model::{
    CanonicalDataset, ID_COLUMN, MetaboliteColumn, PHENOTYPE_COLUMN, PatientId, PatientMeta,
};
use tracing::debug;

use crate::cell::parse_numeric;
use crate::error::{IngestError, Result};

/// Reads a canonical dataset CSV (`ID, descriptors..., Phenotype, metabolites...`).
///
/// Metabolite cells that do not parse become missing. A patient id that is
/// not a valid id is fatal.
pub fn read_canonical_dataset(path: &Path) -> Result<CanonicalDataset> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let csv_error = |source| IngestError::CsvParse {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(csv_error)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|header| header.trim().trim_matches('\u{feff}').to_string())
        .collect();
    if headers.first().map(String::as_str) != Some(ID_COLUMN) {
        return Err(IngestError::MissingColumn {
            column: ID_COLUMN.to_string(),
            path: path.to_path_buf(),
        });
    }
    let phenotype_index = headers
        .iter()
        .position(|header| header == PHENOTYPE_COLUMN)
        .ok_or_else(|| IngestError::MissingColumn {
            column: PHENOTYPE_COLUMN.to_string(),
            path: path.to_path_buf(),
        })?;

    let descriptor_names = headers[1..phenotype_index].to_vec();
    let metabolite_names = &headers[phenotype_index + 1..];
    let mut patients = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); metabolite_names.len()];

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row = index + 1;
        let id_cell = record.get(0).unwrap_or_default().trim();
        let patient_id = parse_numeric(id_cell)
            .and_then(PatientId::from_numeric)
            .ok_or_else(|| IngestError::InvalidValue {
                field: "patient id",
                value: id_cell.to_string(),
                path: path.to_path_buf(),
                row,
            })?;
        patients.push(PatientMeta {
            patient_id,
            descriptors: (1..phenotype_index)
                .map(|column| record.get(column).unwrap_or_default().trim().to_string())
                .collect(),
            phenotype: record
                .get(phenotype_index)
                .unwrap_or_default()
                .trim()
                .to_string(),
        });
        for (offset, column) in values.iter_mut().enumerate() {
            column.push(
                record
                    .get(phenotype_index + 1 + offset)
                    .and_then(parse_numeric),
            );
        }
    }

    let metabolites = metabolite_names
        .iter()
        .zip(values)
        .map(|(name, column)| MetaboliteColumn::new(name.clone(), column))
        .collect();
    let dataset = CanonicalDataset::new(descriptor_names, patients, metabolites).map_err(
        |source| IngestError::InvalidDataset {
            path: path.to_path_buf(),
            source,
        },
    )?;
    debug!(
        path = %path.display(),
        rows = dataset.row_count(),
        metabolites = dataset.metabolite_count(),
        "read canonical dataset"
    );
    Ok(dataset)
}

//! Canonical dataset to polars frame and CSV bytes.

use metab_model::{CanonicalDataset, ID_COLUMN, PHENOTYPE_COLUMN};
use polars::prelude::{
    Column, CsvWriter, DataFrame, IntoColumn, NamedFrom, PolarsResult, SerWriter, Series,
};

use crate::error::{OutputError, Result};

/// Builds a frame with columns `ID, descriptors..., Phenotype, metabolites...`.
///
/// Missing metabolite values become nulls.
pub fn dataset_frame(dataset: &CanonicalDataset) -> PolarsResult<DataFrame> {
    let patients = dataset.patients();
    let mut columns: Vec<Column> =
        Vec::with_capacity(2 + dataset.descriptor_names().len() + dataset.metabolite_count());

    let ids: Vec<u32> = patients.iter().map(|patient| patient.patient_id.get()).collect();
    columns.push(Series::new(ID_COLUMN.into(), ids).into_column());

    for (index, name) in dataset.descriptor_names().iter().enumerate() {
        let values: Vec<&str> = patients
            .iter()
            .map(|patient| patient.descriptors[index].as_str())
            .collect();
        columns.push(Series::new(name.as_str().into(), values).into_column());
    }

    let phenotypes: Vec<&str> = patients
        .iter()
        .map(|patient| patient.phenotype.as_str())
        .collect();
    columns.push(Series::new(PHENOTYPE_COLUMN.into(), phenotypes).into_column());

    for column in dataset.metabolites() {
        columns.push(
            Series::new(column.name.as_str().into(), column.values.as_slice()).into_column(),
        );
    }
    DataFrame::new(columns)
}

/// Renders `dataset` as CSV with a header row.
pub fn render_dataset_csv(name: &str, dataset: &CanonicalDataset) -> Result<Vec<u8>> {
    let frame_error = |source| OutputError::Frame {
        name: name.to_string(),
        source,
    };
    let mut frame = dataset_frame(dataset).map_err(frame_error)?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut frame)
        .map_err(frame_error)?;
    Ok(buffer)
}

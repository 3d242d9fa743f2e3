pub mod cell;
pub mod config;
pub mod dataset;
pub mod error;
pub mod schema;
pub mod sheet;
pub mod sheets;

pub use cell::{NumericCell, classify_numeric, is_none_literal, parse_bool, parse_numeric};
pub use config::{InputPaths, PipelineConfig, load_config, parse_config_str};
pub use dataset::read_canonical_dataset;
pub use error::{IngestError, Result};
pub use schema::{
    MasterSheetSchema, MetaboliteSheetSchema, MetadataSheetSchema, QcSheetSchema, SourceSchemas,
};
pub use sheet::{RawSheet, read_sheet};
pub use sheets::{
    MasterRow, MasterSheet, MetaboliteRow, MetaboliteSheet, MetadataRow, MetadataSheet, QcSheet,
    load_master_sheet, load_metabolite_sheet, load_metadata_sheet, load_qc_sheet,
};

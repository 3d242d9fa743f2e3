//! Raw positional sheet reading.
//!
//! Source sheets are addressed by row and column index, not by header name,
//! so they are read as a plain grid of trimmed strings with no header
//! interpretation. Rows of empty cells (`,,,`) are kept so positional
//! offsets below them stay valid; the CSV reader itself skips zero-length
//! lines.

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{IngestError, Result};

/// A sheet exported to CSV, held as a row-major grid of cells.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub path: PathBuf,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    /// Cell at `(row, column)`; cells past the end of a ragged row are empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map_or("", String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of one row, or zero when the row does not exist.
    pub fn width(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    /// True when every cell of the row is blank.
    pub fn is_blank_row(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .is_none_or(|cells| cells.iter().all(|cell| cell.is_empty()))
    }
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Reads a CSV export of a spreadsheet into a [`RawSheet`].
pub fn read_sheet(path: &Path) -> Result<RawSheet> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(normalize_cell).collect());
    }
    if rows.is_empty() {
        return Err(IngestError::EmptySheet {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), rows = rows.len(), "read sheet");
    Ok(RawSheet {
        path: path.to_path_buf(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_reads_ragged_rows_without_headers() {
        let file = create_temp_csv("\u{feff}a,b,c\n1,2\n\n\"x, y\",3,4\n");
        let sheet = read_sheet(file.path()).unwrap();
        assert_eq!(sheet.cell(0, 0), "a");
        assert_eq!(sheet.cell(1, 2), "");
        assert_eq!(sheet.cell(2, 0), "x, y");
        assert_eq!(sheet.width(0), 3);
        assert_eq!(sheet.width(1), 2);
        assert_eq!(sheet.width(9), 0);
    }

    #[test]
    fn test_missing_file() {
        let result = read_sheet(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(IngestError::FileNotFound { .. })));
    }

    #[test]
    fn test_empty_file() {
        let file = create_temp_csv("");
        assert!(matches!(
            read_sheet(file.path()),
            Err(IngestError::EmptySheet { .. })
        ));
    }

    #[test]
    fn test_blank_row_detection() {
        let file = create_temp_csv("a,b\n,\nc,d\n");
        let sheet = read_sheet(file.path()).unwrap();
        assert!(!sheet.is_blank_row(0));
        assert!(sheet.is_blank_row(1));
        assert!(sheet.is_blank_row(5));
    }
}

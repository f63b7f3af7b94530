//! Turns an uploaded table into a [`MasterDataset`].

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::key::{StableKey, normalize_item};
use super::table::{self, RawTable, TableError, TableFormat};
use super::{
    COL_CATEGORY, COL_CODER, COL_ITEM, COL_RESPONSE_ID, COL_TYPE, COL_VALUE, MasterDataset,
    REQUIRED_COLUMNS, ResponseRow, ResponseType,
};

/// Cell texts that spreadsheet exports and dataframe tools write for a
/// missing value. A `value` cell holding one of these counts as empty.
pub const NULL_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a cell is blank or one of the [`NULL_MARKERS`].
pub fn is_missing_value(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || NULL_MARKERS.contains(&cell)
}

/// Errors raised while loading an upload. None of them yields partial data.
#[derive(Debug, Error)]
pub enum DatasetLoadError {
    /// The file could not be read from disk.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Upload path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The contents could not be decoded as a table.
    #[error("Could not read {}: {source}", origin(.path))]
    Parse {
        /// Upload path, when loaded from disk.
        path: Option<PathBuf>,
        /// Decoding failure.
        source: TableError,
    },
    /// One or more required columns are absent.
    #[error("{} is missing required column(s): {}", origin(.path), join_columns(.missing))]
    Schema {
        /// Upload path, when loaded from disk.
        path: Option<PathBuf>,
        /// Every missing column name, in canonical order.
        missing: Vec<String>,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "upload".to_string())
}

fn join_columns(columns: &[String]) -> String {
    columns.join(", ")
}

/// Load and normalize a dataset file.
pub fn load_dataset(path: &Path) -> Result<MasterDataset, DatasetLoadError> {
    let bytes = std::fs::read(path).map_err(|source| DatasetLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let hinted = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(TableFormat::from_extension);
    let sniffed = TableFormat::sniff(&bytes);
    if hinted.is_some_and(|hint| hint != sniffed) {
        warn!(
            "{} looks like {:?} despite its extension; reading by content",
            path.display(),
            sniffed
        );
    }
    let mut dataset = load_dataset_bytes(&bytes, Some(path))?;
    dataset.source = Some(path.to_path_buf());
    Ok(dataset)
}

/// Load and normalize a dataset from raw upload bytes.
pub fn load_dataset_bytes(
    bytes: &[u8],
    path: Option<&Path>,
) -> Result<MasterDataset, DatasetLoadError> {
    let table = table::read_table(bytes).map_err(|source| DatasetLoadError::Parse {
        path: path.map(Path::to_path_buf),
        source,
    })?;
    let dataset = build_dataset(&table).map_err(|missing| DatasetLoadError::Schema {
        path: path.map(Path::to_path_buf),
        missing,
    })?;
    info!(
        "Loaded {} labelable rows ({} dropped with empty value)",
        dataset.len(),
        dataset.dropped_empty()
    );
    Ok(dataset)
}

fn build_dataset(table: &RawTable) -> Result<MasterDataset, Vec<String>> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| table.column(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let response_id_col = table.column(COL_RESPONSE_ID);
    let type_col = table.column(COL_TYPE);
    let item_col = table.column(COL_ITEM);
    let value_col = table.column(COL_VALUE);
    let category_col = table.column(COL_CATEGORY);
    let coder_col = table.column(COL_CODER);

    let mut rows = Vec::with_capacity(table.records.len());
    let mut dropped_empty = 0;
    let mut unrecognized = 0;
    for record in &table.records {
        let value = table.cell(record, value_col);
        if is_missing_value(value) {
            dropped_empty += 1;
            continue;
        }
        let response_id = table.cell(record, response_id_col);
        let raw_type = table.cell(record, type_col);
        let item = table.cell(record, item_col);
        let kind = ResponseType::parse(raw_type);
        if matches!(kind, ResponseType::Unrecognized(_)) {
            unrecognized += 1;
        }
        rows.push(ResponseRow {
            key: StableKey::new(response_id, raw_type, item),
            response_id: response_id.trim().to_string(),
            kind,
            item: normalize_item(item),
            value: value.trim().to_string(),
            category: table.cell(record, category_col).trim().to_string(),
            coder: table.cell(record, coder_col).trim().to_string(),
            source_line: record.line,
        });
    }
    if unrecognized > 0 {
        warn!("{unrecognized} row(s) have a type other than positive/negative");
    }
    Ok(MasterDataset::from_rows(rows).with_dropped_empty(dropped_empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "ResponseId,type,item,value\n\
        R2,negative,1,too crowded\n\
        R1,positive,1.0,skilled workers\n\
        R4,positive,2,\n\
        R3,Positive,2,new food\n";

    #[test]
    fn loads_filters_and_orders_rows() {
        let dataset = load_dataset_bytes(SAMPLE.as_bytes(), None).unwrap();
        let ids: Vec<&str> = dataset
            .rows()
            .iter()
            .map(|row| row.response_id.as_str())
            .collect();
        assert_eq!(ids, vec!["R1", "R3", "R2"]);
        assert_eq!(dataset.dropped_empty(), 1);
        assert_eq!(dataset.rows()[0].item, "1");
        assert_eq!(dataset.rows()[0].key, StableKey::new("R1", "positive", "1"));
        assert_eq!(dataset.rows()[1].kind, ResponseType::Positive);
        assert!(dataset.rows().iter().all(|row| row.category.is_empty()));
    }

    #[test]
    fn null_markers_count_as_empty_values() {
        let csv = "ResponseId,type,item,value\n\
            R1,positive,1,NaN\n\
            R2,positive,2,NA\n\
            R3,negative,1,#N/A\n\
            R4,negative,2, null \n\
            R5,positive,3,real answer\n\
            R6,positive,4,Nana\n";
        let dataset = load_dataset_bytes(csv.as_bytes(), None).unwrap();
        let ids: Vec<&str> = dataset
            .rows()
            .iter()
            .map(|row| row.response_id.as_str())
            .collect();
        assert_eq!(ids, vec!["R5", "R6"]);
        assert_eq!(dataset.dropped_empty(), 4);
    }

    #[test]
    fn markers_are_matched_exactly() {
        assert!(is_missing_value("  "));
        assert!(is_missing_value("N/A"));
        assert!(!is_missing_value("NONE"));
        assert!(!is_missing_value("none of them"));
    }

    #[test]
    fn loads_workbook_with_error_cells_dropped() {
        let bytes = include_bytes!("../../tests/fixtures/master.xlsx");
        let dataset = load_dataset_bytes(bytes, None).unwrap();
        let ids: Vec<&str> = dataset
            .rows()
            .iter()
            .map(|row| row.response_id.as_str())
            .collect();
        assert_eq!(ids, vec!["R1", "R3"]);
        assert_eq!(dataset.dropped_empty(), 1);
        // A numeric sheet cell and a CSV "3.0" share a key.
        assert_eq!(dataset.rows()[0].key, StableKey::new("R1", "positive", "3.0"));
        assert_eq!(dataset.rows()[0].source_line, 3);
        assert_eq!(dataset.rows()[1].item, "2.5");
        assert_eq!(dataset.rows()[1].source_line, 6);
    }

    #[test]
    fn latin1_upload_with_bom_keeps_first_column() {
        let bytes = b"\xEF\xBB\xBFResponseId,type,item,value\nR1,positive,1,caf\xe9\n";
        let dataset = load_dataset_bytes(bytes, None).unwrap();
        assert_eq!(dataset.rows()[0].response_id, "R1");
        assert_eq!(dataset.rows()[0].value, "caf\u{e9}");
    }

    #[test]
    fn reports_every_missing_column() {
        let err = load_dataset_bytes(b"ResponseId,value\nR1,x\n", None).unwrap_err();
        match err {
            DatasetLoadError::Schema { missing, .. } => {
                assert_eq!(missing, vec!["type".to_string(), "item".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let err = load_dataset_bytes(b"responseid,type,item,value\nR1,positive,1,x\n", None)
            .unwrap_err();
        assert!(err.to_string().contains("ResponseId"));
    }

    #[test]
    fn keeps_optional_category_and_coder_columns() {
        let csv = "ResponseId;type;item;value;category;coder\nR1;positive;1;x;Other;AB\n";
        let dataset = load_dataset_bytes(csv.as_bytes(), None).unwrap();
        assert_eq!(dataset.rows()[0].category, "Other");
        assert_eq!(dataset.rows()[0].coder, "AB");
    }

    #[test]
    fn reads_latin1_files_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("upload.csv");
        std::fs::write(&path, b"ResponseId,type,item,value\nR1,positive,1,caf\xe9\n").unwrap();
        let dataset = load_dataset(&path).unwrap();
        assert_eq!(dataset.rows()[0].value, "caf\u{e9}");
        assert_eq!(dataset.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn undecodable_upload_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"PK\x03\x04garbage").unwrap();
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, DatasetLoadError::Parse { path: Some(_), .. }));
        assert!(err.to_string().contains("broken.xlsx"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = load_dataset(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, DatasetLoadError::Read { .. }));
    }
}

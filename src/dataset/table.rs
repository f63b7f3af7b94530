//! Tabular decoding for uploaded datasets and progress files.
//!
//! Produces a header row plus string cells, whatever the on-disk format. The
//! format is chosen from the file contents: ZIP or OLE2 signatures are treated as
//! a spreadsheet (first sheet only), everything else as delimited text.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use thiserror::Error;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors raised while decoding a table.
#[derive(Debug, Error)]
pub enum TableError {
    /// The delimited text could not be parsed.
    #[error("CSV parse error{}: {source}", line_suffix(.line))]
    Csv {
        /// 1-based line of the failing record, when known.
        line: Option<u64>,
        /// Underlying CSV error.
        source: csv::Error,
    },
    /// A record had more cells than the header.
    #[error("line {line}: expected at most {expected} fields, found {found}")]
    RaggedRow {
        /// 1-based line of the record.
        line: u64,
        /// Header width.
        expected: usize,
        /// Cells found on the line.
        found: usize,
    },
    /// The spreadsheet container could not be read.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[source] calamine::Error),
    /// The workbook contains no worksheet.
    #[error("spreadsheet has no worksheets")]
    NoSheet,
    /// The input had no header row.
    #[error("file is empty")]
    Empty,
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|line| format!(" at line {line}"))
        .unwrap_or_default()
}

/// On-disk table flavor, decided from content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    /// Delimited text.
    Csv,
    /// Excel-style workbook (`.xlsx`, `.xls`, `.ods`).
    Spreadsheet,
}

impl TableFormat {
    /// Pick the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            TableFormat::Spreadsheet
        } else {
            TableFormat::Csv
        }
    }

    /// Format suggested by a file extension, if it names one.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(TableFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(TableFormat::Spreadsheet),
            _ => None,
        }
    }
}

/// Text encoding that successfully decoded a CSV payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    /// Valid UTF-8 (an optional BOM is dropped).
    Utf8,
    /// Fallback single-byte decoding.
    Latin1,
}

/// One data row with its 1-based source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    /// Line (CSV) or sheet row (spreadsheet) the record came from.
    pub line: u64,
    /// Trimmed cells, padded to the header width.
    pub cells: Vec<String>,
}

/// Decoded table: header names plus string rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Trimmed header names.
    pub headers: Vec<String>,
    /// Data rows in file order.
    pub records: Vec<RawRecord>,
}

impl RawTable {
    /// Index of a column by exact (case-sensitive) name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell text, or `""` when the column is absent.
    pub fn cell<'a>(&self, record: &'a RawRecord, column: Option<usize>) -> &'a str {
        column
            .and_then(|idx| record.cells.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Decode any supported table from raw bytes.
pub fn read_table(bytes: &[u8]) -> Result<RawTable, TableError> {
    match TableFormat::sniff(bytes) {
        TableFormat::Spreadsheet => read_spreadsheet(bytes),
        TableFormat::Csv => {
            let (text, _) = decode_text(bytes);
            read_csv(&text)
        }
    }
}

/// Decode bytes as UTF-8, falling back to Latin-1 when that fails.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (
            text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
            TextEncoding::Utf8,
        ),
        Err(_) => (
            bytes
                .strip_prefix(UTF8_BOM)
                .unwrap_or(bytes)
                .iter()
                .map(|&byte| byte as char)
                .collect(),
            TextEncoding::Latin1,
        ),
    }
}

/// Guess the field delimiter from the header line.
pub fn detect_delimiter(text: &str) -> u8 {
    let Some(header) = text.lines().find(|line| !line.trim().is_empty()) else {
        return b',';
    };
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(idx) = DELIMITER_CANDIDATES.iter().position(|c| *c == byte) {
            counts[idx] += 1;
        }
    }
    // Earlier candidates win ties, so a comma is kept unless beaten.
    let mut best = 0;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    DELIMITER_CANDIDATES[best]
}

/// Parse delimited text with a detected delimiter and a header row.
pub fn read_csv(text: &str) -> Result<RawTable, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| TableError::Csv { line: Some(1), source })?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(TableError::Empty);
    }

    let mut lines = LineIndex::new(text);
    let mut records = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(source) => {
                let line = source.position().map(|pos| lines.line_at(pos));
                return Err(TableError::Csv { line, source });
            }
        };
        let line = record
            .position()
            .map(|pos| lines.line_at(pos))
            .unwrap_or_default();
        if record.len() > headers.len() {
            return Err(TableError::RaggedRow {
                line,
                expected: headers.len(),
                found: record.len(),
            });
        }
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(headers.len(), String::new());
        records.push(RawRecord { line, cells });
    }
    Ok(RawTable { headers, records })
}

/// Maps reader byte offsets to 1-based physical lines.
///
/// A record's `csv::Position` is taken before the reader skips any blank lines
/// ahead of it, so both its line and byte point at the first blank line. The
/// index steps over those terminators to reach the record's own line. Offsets
/// arrive in increasing order, so the scan resumes where the previous lookup
/// stopped.
struct LineIndex<'a> {
    text: &'a [u8],
    offset: usize,
    line: u64,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, pos: &csv::Position) -> u64 {
        let mut target = usize::try_from(pos.byte())
            .unwrap_or(usize::MAX)
            .min(self.text.len());
        while matches!(self.text.get(target), Some(b'\r' | b'\n')) {
            target += 1;
        }
        if target < self.offset {
            self.offset = 0;
            self.line = 1;
        }
        let newlines = self.text[self.offset..target]
            .iter()
            .filter(|&&byte| byte == b'\n')
            .count();
        self.line += newlines as u64;
        self.offset = target;
        self.line
    }
}

/// Read the first worksheet of a workbook.
pub fn read_spreadsheet(bytes: &[u8]) -> Result<RawTable, TableError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(TableError::Spreadsheet)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TableError::NoSheet)?
        .map_err(TableError::Spreadsheet)?;
    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or(0);

    let mut rows = range.rows().enumerate();
    let Some((_, header_row)) = rows.next() else {
        return Err(TableError::Empty);
    };
    let headers: Vec<String> = header_row.iter().map(cell_text).collect();
    if headers.iter().all(String::is_empty) {
        return Err(TableError::Empty);
    }

    let records = rows
        .map(|(idx, row)| {
            let mut cells: Vec<String> = row.iter().map(cell_text).collect();
            cells.resize(headers.len(), String::new());
            RawRecord {
                line: first_row + idx as u64 + 1,
                cells,
            }
        })
        .filter(|record| record.cells.iter().any(|cell| !cell.is_empty()))
        .collect();
    Ok(RawTable { headers, records })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_string(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        Data::Float(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::Error(_) => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

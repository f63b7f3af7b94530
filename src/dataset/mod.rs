//! Master dataset of labelable survey responses.
//!
//! Uploads are decoded by [`table`], validated and normalized by [`loader`], and
//! every surviving row gets a [`StableKey`]. The resulting [`MasterDataset`] is
//! read-only working state; it is rebuilt on every upload.

pub mod key;
pub mod loader;
pub mod table;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

pub use key::StableKey;
pub use loader::{DatasetLoadError, load_dataset, load_dataset_bytes};

/// Column holding the respondent identifier.
pub const COL_RESPONSE_ID: &str = "ResponseId";
/// Column holding the response polarity.
pub const COL_TYPE: &str = "type";
/// Column identifying the question within a response.
pub const COL_ITEM: &str = "item";
/// Column holding the free text to classify.
pub const COL_VALUE: &str = "value";
/// Optional column carrying a pre-assigned category.
pub const COL_CATEGORY: &str = "category";
/// Optional column carrying the coder of a pre-assigned category.
pub const COL_CODER: &str = "coder";

/// Columns every upload must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = [COL_RESPONSE_ID, COL_TYPE, COL_ITEM, COL_VALUE];

/// Polarity of a response, which selects its category catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// Reasons given in favor.
    Positive,
    /// Reasons given against.
    Negative,
    /// Any other value; kept so the row can be reported, never labeled.
    Unrecognized(String),
}

impl ResponseType {
    /// Parse a `type` cell, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        match key::normalize_kind(raw).as_str() {
            "positive" => ResponseType::Positive,
            "negative" => ResponseType::Negative,
            _ => ResponseType::Unrecognized(raw.trim().to_string()),
        }
    }

    /// Sort rank: positives, then negatives, then everything else.
    pub fn order(&self) -> u8 {
        match self {
            ResponseType::Positive => 0,
            ResponseType::Negative => 1,
            ResponseType::Unrecognized(_) => 2,
        }
    }

    /// Canonical lowercase name as written to files.
    pub fn as_str(&self) -> &str {
        match self {
            ResponseType::Positive => "positive",
            ResponseType::Negative => "negative",
            ResponseType::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labelable unit from the upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseRow {
    /// Identity used for progress tracking.
    pub key: StableKey,
    /// Respondent identifier as uploaded (trimmed).
    pub response_id: String,
    /// Polarity of the response.
    pub kind: ResponseType,
    /// Normalized item identifier.
    pub item: String,
    /// Free text to classify.
    pub value: String,
    /// Category already present in the upload, or empty.
    pub category: String,
    /// Coder of the pre-assigned category, or empty.
    pub coder: String,
    /// Line or sheet row the record came from, for error messages.
    pub source_line: u64,
}

/// Normalized, ordered rows of one upload.
#[derive(Clone, Debug, Default)]
pub struct MasterDataset {
    /// File the rows were read from, when known.
    pub source: Option<PathBuf>,
    rows: Vec<ResponseRow>,
    dropped_empty: usize,
}

impl MasterDataset {
    /// Build a dataset from rows, applying the positive-before-negative order.
    ///
    /// The sort is stable, so upload order is preserved within each type.
    pub fn from_rows(mut rows: Vec<ResponseRow>) -> Self {
        rows.sort_by_key(|row| row.kind.order());
        Self {
            source: None,
            rows,
            dropped_empty: 0,
        }
    }

    pub(crate) fn with_dropped_empty(mut self, dropped: usize) -> Self {
        self.dropped_empty = dropped;
        self
    }

    /// Rows in presentation order.
    pub fn rows(&self) -> &[ResponseRow] {
        &self.rows
    }

    /// Row at a presentation index.
    pub fn get(&self, index: usize) -> Option<&ResponseRow> {
        self.rows.get(index)
    }

    /// Number of labelable rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no labelable rows survived loading.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows discarded during loading because `value` was blank.
    pub fn dropped_empty(&self) -> usize {
        self.dropped_empty
    }

    /// Distinct keys present in this upload.
    pub fn keys(&self) -> HashSet<&StableKey> {
        self.rows.iter().map(|row| &row.key).collect()
    }
}

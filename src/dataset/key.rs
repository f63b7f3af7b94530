//! Stable row identity.
//!
//! A row is identified by (`ResponseId`, `type`, `item`) after normalization, so
//! the same logical row keeps its key across re-uploads even when row order or
//! cell representations change (`3`, `3.0` and ` 3 ` are the same item).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Deterministic identity of a labelable row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableKey {
    response_id: String,
    kind: String,
    item: String,
}

impl StableKey {
    /// Build a key from raw identity cells, normalizing each component.
    pub fn new(response_id: &str, kind: &str, item: &str) -> Self {
        Self {
            response_id: response_id.trim().to_string(),
            kind: normalize_kind(kind),
            item: normalize_item(item),
        }
    }

    /// Normalized response identifier.
    pub fn response_id(&self) -> &str {
        &self.response_id
    }

    /// Normalized (trimmed, lowercased) type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Normalized item identifier.
    pub fn item(&self) -> &str {
        &self.item
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.response_id, self.kind, self.item)
    }
}

/// Trim and lowercase a `type` cell.
pub fn normalize_kind(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trim an `item` cell and drop the `.0` tail left behind by float parsing.
pub fn normalize_item(raw: &str) -> String {
    let trimmed = raw.trim();
    match whole_float_pattern().captures(trimmed) {
        Some(caps) => caps["int"].to_string(),
        None => trimmed.to_string(),
    }
}

fn whole_float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<int>[+-]?\d+)\.0+$").expect("whole float regex must compile")
    })
}

//! Category catalogs offered to the coder.
//!
//! Each response type has five substantive categories plus three fixed escape
//! hatches. The substantive lists can be replaced through config; the escape
//! hatches are always appended.

use crate::dataset::{ResponseRow, ResponseType};
use crate::session::ValidationError;

/// Selector entry shown before the coder picks anything.
pub const PLACEHOLDER: &str = "Please choose";
/// Catch-all for responses that fit no listed category.
pub const OTHER: &str = "Other";
/// For responses that cannot be interpreted.
pub const UNCLASSIFIABLE: &str = "Unclassifiable";
/// Escape hatch for rows filed under `positive` by mistake.
pub const NOT_ACTUALLY_POSITIVE: &str = "Not actually positive";
/// Escape hatch for rows filed under `negative` by mistake.
pub const NOT_ACTUALLY_NEGATIVE: &str = "Not actually negative";

/// Built-in substantive categories for positive responses.
pub const DEFAULT_POSITIVE: [&str; 5] = [
    "Brings highly skilled workers that will help British firms innovate",
    "Helps balance and support an aging population",
    "Enriches and diversifies British culture and society",
    "Provides needed staffing for certain sectors and public services",
    "Gives people an opportunity for a better life in the UK",
];

/// Built-in substantive categories for negative responses.
pub const DEFAULT_NEGATIVE: [&str; 5] = [
    "Takes jobs away from and decreases wages for British people",
    "Contributes to overcrowding and depletes limited resources",
    "Brings ideas and values that are incompatible with British culture",
    "Makes British communities less safe and less cohesive",
    "Puts pressure on public finances and services",
];

/// Full choice lists for both response types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryCatalog {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_POSITIVE.iter().map(|s| s.to_string()).collect(),
            DEFAULT_NEGATIVE.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl CategoryCatalog {
    /// Build a catalog from substantive lists, appending the fixed entries.
    ///
    /// Entries are trimmed; blanks and repeats are dropped.
    pub fn new(positive: Vec<String>, negative: Vec<String>) -> Self {
        Self {
            positive: with_fixed_entries(positive, NOT_ACTUALLY_POSITIVE),
            negative: with_fixed_entries(negative, NOT_ACTUALLY_NEGATIVE),
        }
    }

    /// Choices for a response type, or `None` for an unrecognized type.
    pub fn choices(&self, kind: &ResponseType) -> Option<&[String]> {
        match kind {
            ResponseType::Positive => Some(&self.positive),
            ResponseType::Negative => Some(&self.negative),
            ResponseType::Unrecognized(_) => None,
        }
    }

    /// Choices for a row, failing for rows whose type has no catalog.
    pub fn choices_for(&self, row: &ResponseRow) -> Result<&[String], ValidationError> {
        self.choices(&row.kind)
            .ok_or_else(|| ValidationError::UnknownType {
                line: row.source_line,
                response_id: row.response_id.clone(),
                value: row.kind.to_string(),
            })
    }

    /// Check a submitted category against the row's catalog.
    pub fn validate<'a>(
        &self,
        row: &ResponseRow,
        category: &'a str,
    ) -> Result<&'a str, ValidationError> {
        let category = category.trim();
        if category.is_empty() || category == PLACEHOLDER {
            return Err(ValidationError::NoCategory);
        }
        let choices = self.choices_for(row)?;
        if choices.iter().any(|choice| choice == category) {
            Ok(category)
        } else {
            Err(ValidationError::NotInCatalog {
                category: category.to_string(),
                kind: row.kind.to_string(),
            })
        }
    }
}

fn with_fixed_entries(substantive: Vec<String>, not_actually: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(substantive.len() + 3);
    let extras = [OTHER, UNCLASSIFIABLE, not_actually].map(str::to_string);
    for entry in substantive.into_iter().chain(extras) {
        let entry = entry.trim();
        if entry.is_empty() || entry == PLACEHOLDER || out.iter().any(|seen| seen == entry) {
            continue;
        }
        out.push(entry.to_string());
    }
    out
}

//! Per-coder labeling progress.
//!
//! [`AnnotatorProgress`] is the only durable state in the app: an ordered set of
//! [`LabelRecord`]s with at most one record per [`StableKey`]. [`store`] maps it to
//! a CSV file per coder and [`merge`] folds it back into a freshly loaded dataset.

pub mod merge;
pub mod store;

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::dataset::{MasterDataset, StableKey};
use crate::session::ValidationError;

pub use store::{ProgressError, ProgressStore};

/// Coder identity: the trimmed display form plus its filename-safe stem.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotatorId {
    display: String,
    stem: String,
}

impl AnnotatorId {
    /// Parse a user-supplied coder id; it must keep at least one safe character.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let display = raw.trim().to_string();
        let stem = sanitize(&display);
        if stem.is_empty() {
            return Err(ValidationError::InvalidCoderId {
                raw: raw.to_string(),
            });
        }
        Ok(Self { display, stem })
    }

    /// Id as typed (trimmed); written to the `coder` column.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Filename-safe form (`[A-Za-z0-9_-]`).
    pub fn file_stem(&self) -> &str {
        &self.stem
    }
}

impl fmt::Display for AnnotatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Strip every character that is not ASCII alphanumeric, `_` or `-`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// One coder's judgment on one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelRecord {
    /// Row identity.
    pub key: StableKey,
    /// Chosen category; empty means unlabeled.
    pub category: String,
    /// Coder who chose it.
    pub coder: String,
}

impl LabelRecord {
    /// True when a category has been chosen.
    pub fn is_done(&self) -> bool {
        !self.category.trim().is_empty()
    }
}

/// Whether an upsert created or overwrote a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// New key appended at the end.
    Inserted,
    /// Existing record updated in place.
    Updated,
}

/// All label records of one coder, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotatorProgress {
    records: Vec<LabelRecord>,
    index: HashMap<StableKey, usize>,
}

impl AnnotatorProgress {
    /// Empty set for a coder's first session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records in file order, collapsing repeated keys.
    ///
    /// A repeated key keeps the position of its first occurrence and the values
    /// of its last. Returns the set and the number of collapsed duplicates.
    pub fn from_records(records: impl IntoIterator<Item = LabelRecord>) -> (Self, usize) {
        let mut progress = Self::new();
        let mut duplicates = 0;
        for record in records {
            if progress.upsert(record.key, record.category, record.coder) == Upsert::Updated {
                duplicates += 1;
            }
        }
        (progress, duplicates)
    }

    /// Record a category for a key, overwriting in place when the key exists.
    pub fn upsert(
        &mut self,
        key: StableKey,
        category: impl Into<String>,
        coder: impl Into<String>,
    ) -> Upsert {
        let category = category.into();
        let coder = coder.into();
        if let Some(&idx) = self.index.get(&key) {
            let record = &mut self.records[idx];
            record.category = category;
            record.coder = coder;
            return Upsert::Updated;
        }
        self.index.insert(key.clone(), self.records.len());
        self.records.push(LabelRecord {
            key,
            category,
            coder,
        });
        Upsert::Inserted
    }

    /// Record for a key, if any.
    pub fn get(&self, key: &StableKey) -> Option<&LabelRecord> {
        self.index.get(key).map(|&idx| &self.records[idx])
    }

    /// True when the key carries a non-empty category.
    pub fn is_done(&self, key: &StableKey) -> bool {
        self.get(key).is_some_and(LabelRecord::is_done)
    }

    /// Keys with a non-empty category.
    pub fn done_keys(&self) -> HashSet<&StableKey> {
        self.records
            .iter()
            .filter(|record| record.is_done())
            .map(|record| &record.key)
            .collect()
    }

    /// Records in persisted order.
    pub fn records(&self) -> &[LabelRecord] {
        &self.records
    }

    /// Number of records, labeled or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records exist.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Done/total for this coder against a dataset.
    pub fn counter(&self, dataset: &MasterDataset) -> ProgressCounter {
        let done = dataset
            .rows()
            .iter()
            .filter(|row| self.is_done(&row.key))
            .count();
        ProgressCounter {
            done,
            total: dataset.len(),
        }
    }
}

/// Progress of one coder against the current dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressCounter {
    /// Dataset rows this coder has labeled.
    pub done: usize,
    /// Labelable rows in the dataset.
    pub total: usize,
}

impl ProgressCounter {
    /// Rows still to label.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.done)
    }

    /// Completed share in `[0, 1]`; an empty dataset counts as complete.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f32 / self.total as f32
        }
    }
}

impl fmt::Display for ProgressCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.done, self.total)
    }
}

//! Outer join of saved labels onto a freshly loaded dataset.
//!
//! Rows are matched by [`StableKey`]. A non-empty saved category always wins
//! over whatever the upload carried; an empty saved category never erases one.

use std::path::Path;

use crate::atomic_write::write_atomic;
use crate::dataset::{
    COL_CATEGORY, COL_CODER, COL_ITEM, COL_RESPONSE_ID, COL_TYPE, COL_VALUE, MasterDataset,
    ResponseRow, StableKey,
};

use super::{AnnotatorProgress, ProgressError};

/// Where a merged category came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelSource {
    /// The coder's progress file.
    Saved,
    /// The uploaded dataset's own `category` column.
    Upload,
    /// Neither side had a category.
    Unlabeled,
}

/// A dataset row with its effective category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedRow<'a> {
    /// Underlying dataset row.
    pub row: &'a ResponseRow,
    /// Effective category (may be empty).
    pub category: &'a str,
    /// Coder associated with the effective category.
    pub coder: &'a str,
    /// Side the category was taken from.
    pub source: LabelSource,
}

/// Merge a coder's saved labels into every dataset row, in dataset order.
pub fn merge_saved<'a>(
    dataset: &'a MasterDataset,
    progress: &'a AnnotatorProgress,
) -> Vec<MergedRow<'a>> {
    dataset
        .rows()
        .iter()
        .map(|row| match progress.get(&row.key) {
            Some(saved) if saved.is_done() => MergedRow {
                row,
                category: &saved.category,
                coder: &saved.coder,
                source: LabelSource::Saved,
            },
            _ if !row.category.is_empty() => MergedRow {
                row,
                category: &row.category,
                coder: &row.coder,
                source: LabelSource::Upload,
            },
            _ => MergedRow {
                row,
                category: "",
                coder: "",
                source: LabelSource::Unlabeled,
            },
        })
        .collect()
}

/// Saved keys that the dataset no longer contains.
pub fn orphaned_keys<'a>(
    dataset: &MasterDataset,
    progress: &'a AnnotatorProgress,
) -> Vec<&'a StableKey> {
    let present = dataset.keys();
    progress
        .records()
        .iter()
        .map(|record| &record.key)
        .filter(|key| !present.contains(key))
        .collect()
}

/// Encode merged rows as CSV with the dataset's columns plus category and coder.
pub fn encode_merged(rows: &[MergedRow<'_>]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record([
        COL_RESPONSE_ID,
        COL_TYPE,
        COL_ITEM,
        COL_VALUE,
        COL_CATEGORY,
        COL_CODER,
    ])?;
    for merged in rows {
        writer.write_record([
            merged.row.response_id.as_str(),
            merged.row.kind.as_str(),
            merged.row.item.as_str(),
            merged.row.value.as_str(),
            merged.category,
            merged.coder,
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// Merge the coder's labels onto `dataset` and write the result to `path`.
pub fn write_merged_file(
    dataset: &MasterDataset,
    progress: &AnnotatorProgress,
    path: &Path,
) -> Result<(), ProgressError> {
    let data = encode_merged(&merge_saved(dataset, progress))?;
    write_atomic(path, &data).map_err(|source| ProgressError::Write {
        path: path.to_path_buf(),
        source,
    })
}

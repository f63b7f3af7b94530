//! CSV-backed storage of [`AnnotatorProgress`], one file per coder.
//!
//! Files are named `classified_responses_<stem>.csv` and hold the columns
//! `ResponseId,type,item,category,coder`. Keys are rebuilt from the identity
//! columns on load, so hand-edited files stay valid as long as those columns do.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{AnnotatorId, AnnotatorProgress, LabelRecord};
use crate::app_dirs;
use crate::atomic_write::{stray_temp_files, write_atomic};
use crate::dataset::table::{self, TableError};
use crate::dataset::{COL_CATEGORY, COL_CODER, COL_ITEM, COL_RESPONSE_ID, COL_TYPE, StableKey};

/// Prefix of every progress file name.
pub const PROGRESS_FILE_PREFIX: &str = "classified_responses_";
/// Column order of progress files.
pub const PROGRESS_COLUMNS: [&str; 5] = [COL_RESPONSE_ID, COL_TYPE, COL_ITEM, COL_CATEGORY, COL_CODER];

/// Errors raised while loading or saving progress.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// The progress directory could not be resolved or created.
    #[error("Progress directory unavailable: {0}")]
    Dir(#[from] app_dirs::AppDirError),
    /// The progress file exists but could not be read.
    #[error("Failed to read progress file {path}: {source}")]
    Read {
        /// Progress file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The progress file exists but its contents are unusable.
    #[error("Progress file {path} is corrupt: {reason}")]
    Corrupt {
        /// Progress file path.
        path: PathBuf,
        /// What was wrong, including the line when known.
        reason: String,
    },
    /// Records could not be encoded as CSV.
    #[error("Failed to encode progress: {0}")]
    Encode(#[from] csv::Error),
    /// Writing a progress or export file failed; the previous file is untouched.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Directory of per-coder progress files.
#[derive(Clone, Debug)]
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    /// Store rooted at an explicit directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the default `.surveycoder/progress` directory.
    pub fn open_default() -> Result<Self, ProgressError> {
        Ok(Self::new(app_dirs::progress_dir()?))
    }

    /// Directory holding the files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Progress file path for a coder.
    pub fn path_for(&self, annotator: &AnnotatorId) -> PathBuf {
        self.dir
            .join(format!("{PROGRESS_FILE_PREFIX}{}.csv", annotator.file_stem()))
    }

    /// Load a coder's progress; a missing file is an empty set.
    pub fn load(&self, annotator: &AnnotatorId) -> Result<AnnotatorProgress, ProgressError> {
        let path = self.path_for(annotator);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("No progress yet for {annotator}; starting fresh");
                return Ok(AnnotatorProgress::new());
            }
            Err(source) => return Err(ProgressError::Read { path, source }),
        };
        let stray = stray_temp_files(&path);
        if !stray.is_empty() {
            warn!(
                "{} leftover temp file(s) next to {}; an earlier save was interrupted",
                stray.len(),
                path.display()
            );
        }
        let progress = parse_progress(&bytes, &path)?;
        info!(
            "Loaded {} progress record(s) for {annotator} from {}",
            progress.len(),
            path.display()
        );
        Ok(progress)
    }

    /// Write a coder's full progress set, replacing the file atomically.
    pub fn persist(
        &self,
        annotator: &AnnotatorId,
        progress: &AnnotatorProgress,
    ) -> Result<PathBuf, ProgressError> {
        let path = self.path_for(annotator);
        write_progress_file(progress, &path)?;
        debug!("Persisted {} record(s) to {}", progress.len(), path.display());
        Ok(path)
    }
}

/// Write progress as CSV to any path (used for exports too).
pub fn write_progress_file(progress: &AnnotatorProgress, path: &Path) -> Result<(), ProgressError> {
    let data = encode_progress(progress)?;
    write_atomic(path, &data).map_err(|source| ProgressError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode progress as CSV bytes with a header row.
pub fn encode_progress(progress: &AnnotatorProgress) -> Result<Vec<u8>, ProgressError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(PROGRESS_COLUMNS)?;
    for record in progress.records() {
        writer.write_record([
            record.key.response_id(),
            record.key.kind(),
            record.key.item(),
            record.category.as_str(),
            record.coder.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| ProgressError::Encode(csv::Error::from(err.into_error())))
}

/// Decode a progress file; anything unreadable is reported as corrupt.
pub fn parse_progress(bytes: &[u8], path: &Path) -> Result<AnnotatorProgress, ProgressError> {
    let corrupt = |reason: String| ProgressError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };
    let (text, _) = table::decode_text(bytes);
    let table = table::read_csv(&text).map_err(|err| match err {
        TableError::Empty => corrupt("file is empty (expected at least a header row)".into()),
        other => corrupt(other.to_string()),
    })?;

    let missing: Vec<&str> = [COL_RESPONSE_ID, COL_TYPE, COL_ITEM]
        .into_iter()
        .filter(|name| table.column(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(corrupt(format!("missing column(s): {}", missing.join(", "))));
    }

    let response_id_col = table.column(COL_RESPONSE_ID);
    let type_col = table.column(COL_TYPE);
    let item_col = table.column(COL_ITEM);
    let category_col = table.column(COL_CATEGORY);
    let coder_col = table.column(COL_CODER);

    let records = table.records.iter().map(|record| LabelRecord {
        key: StableKey::new(
            table.cell(record, response_id_col),
            table.cell(record, type_col),
            table.cell(record, item_col),
        ),
        category: table.cell(record, category_col).to_string(),
        coder: table.cell(record, coder_col).to_string(),
    });
    let (progress, duplicates) = AnnotatorProgress::from_records(records);
    if duplicates > 0 {
        warn!(
            "{} contains {duplicates} repeated key(s); the last value of each was kept",
            path.display()
        );
    }
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn coder() -> AnnotatorId {
        AnnotatorId::parse("AB").unwrap()
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path());
        let progress = store.load(&coder()).unwrap();
        assert!(progress.is_empty());
    }

    #[test]
    fn persist_then_load_preserves_records_and_order() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress"));
        let mut progress = AnnotatorProgress::new();
        progress.upsert(StableKey::new("R3", "positive", "2"), "Other", "AB");
        progress.upsert(StableKey::new("R1", "positive", "1"), "Category, with comma", "AB");

        let path = store.persist(&coder(), &progress).unwrap();
        assert_eq!(path, dir.path().join("progress").join("classified_responses_AB.csv"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ResponseId,type,item,category,coder\n"));
        assert!(text.contains("\"Category, with comma\""));

        let loaded = store.load(&coder()).unwrap();
        assert_eq!(loaded, progress);
    }

    #[test]
    fn hand_edited_files_are_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("classified_responses_AB.csv");
        std::fs::write(&path, "ResponseId,type,item,category\nR1,Positive,1.0,Other\n").unwrap();

        let loaded = ProgressStore::new(dir.path()).load(&coder()).unwrap();
        let record = loaded.get(&StableKey::new("R1", "positive", "1")).unwrap();
        assert_eq!(record.category, "Other");
        assert_eq!(record.coder, "");
    }

    #[test]
    fn malformed_files_are_corrupt_not_empty() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path());
        let path = store.path_for(&coder());

        std::fs::write(&path, "ResponseId,category\nR1,Other\n").unwrap();
        let err = store.load(&coder()).unwrap_err();
        assert!(matches!(err, ProgressError::Corrupt { .. }));
        assert!(err.to_string().contains("type, item"));

        std::fs::write(&path, "ResponseId,type,item\nR1,positive,1,extra\n").unwrap();
        assert!(matches!(store.load(&coder()), Err(ProgressError::Corrupt { .. })));

        std::fs::write(&path, "").unwrap();
        assert!(matches!(store.load(&coder()), Err(ProgressError::Corrupt { .. })));
        // The corrupt file is left for the operator to inspect.
        assert!(path.exists());
    }

    #[test]
    fn coders_get_separate_files() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path());
        let other = AnnotatorId::parse("C.D").unwrap();
        let mut progress = AnnotatorProgress::new();
        progress.upsert(StableKey::new("R1", "positive", "1"), "Other", "C.D");
        store.persist(&other, &progress).unwrap();

        assert!(store.load(&coder()).unwrap().is_empty());
        assert_eq!(store.load(&other).unwrap().len(), 1);
        assert!(store.path_for(&other).ends_with("classified_responses_CD.csv"));
    }
}

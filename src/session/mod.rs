//! Labeling session state machine.
//!
//! The functions here are pure: they take the dataset, the coder's current
//! progress and an action, and return the next state plus the updated progress.
//! Nothing is written to disk; [`controller::SessionController`] owns that step.
//!
//! The next row is always recomputed from the progress set, never from a
//! counter, so a restart resumes at exactly the same row.

pub mod controller;

use thiserror::Error;
use tracing::debug;

use crate::catalog::CategoryCatalog;
use crate::dataset::{DatasetLoadError, MasterDataset, ResponseRow};
use crate::progress::{AnnotatorId, AnnotatorProgress, ProgressError, Upsert};

pub use controller::SessionController;

/// Rejected user action; prior state is kept and the action may be retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Submit pressed with the placeholder (or nothing) selected.
    #[error("Choose a category before submitting")]
    NoCategory,
    /// The category is not offered for this row's type.
    #[error("\"{category}\" is not a category for {kind} responses")]
    NotInCatalog {
        /// Submitted category.
        category: String,
        /// Row type.
        kind: String,
    },
    /// The row's type has no catalog.
    #[error("Row at line {line} (ResponseId {response_id}) has unsupported type \"{value}\"; expected positive or negative")]
    UnknownType {
        /// Source line or sheet row.
        line: u64,
        /// Respondent id of the row.
        response_id: String,
        /// Offending `type` value.
        value: String,
    },
    /// The coder id has no filename-safe characters.
    #[error("Coder ID \"{raw}\" must contain letters, digits, '_' or '-'")]
    InvalidCoderId {
        /// Id as entered.
        raw: String,
    },
    /// An action needs input that has not been supplied yet.
    #[error("Provide {what} first")]
    MissingInput {
        /// What is missing (e.g. "a coder ID").
        what: &'static str,
    },
    /// Submit arrived while no row is on screen.
    #[error("There is no response awaiting a category")]
    NothingToSubmit,
}

/// Any failure surfaced by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Loading the dataset failed.
    #[error(transparent)]
    Dataset(#[from] DatasetLoadError),
    /// Loading or saving progress failed.
    #[error(transparent)]
    Progress(#[from] ProgressError),
    /// The action was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Where a coder's session stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Coder id and dataset are not both available yet.
    #[default]
    AwaitingInput,
    /// The dataset row at this index is on screen awaiting a category.
    Presenting(usize),
    /// Every dataset row is labeled by this coder.
    Complete,
}

impl SessionState {
    /// Index of the presented row, if any.
    pub fn presented_index(&self) -> Option<usize> {
        match self {
            SessionState::Presenting(index) => Some(*index),
            _ => None,
        }
    }
}

/// Result of a successful submission.
#[derive(Clone, Debug)]
pub struct Transition {
    /// State after the submission.
    pub state: SessionState,
    /// Progress including the new label; not yet persisted.
    pub progress: AnnotatorProgress,
    /// Whether the label was new or replaced an earlier one.
    pub upsert: Upsert,
}

/// First row in dataset order whose key is not done.
pub fn next_row(dataset: &MasterDataset, progress: &AnnotatorProgress) -> Option<usize> {
    dataset
        .rows()
        .iter()
        .position(|row| !progress.is_done(&row.key))
}

/// State for a coder with both inputs present.
pub fn resolve(dataset: &MasterDataset, progress: &AnnotatorProgress) -> SessionState {
    match next_row(dataset, progress) {
        Some(index) => SessionState::Presenting(index),
        None => SessionState::Complete,
    }
}

/// Apply a category choice to the presented row.
///
/// Validation happens before anything changes, so a rejected submission leaves
/// the caller's progress untouched and the same row presented.
pub fn submit(
    dataset: &MasterDataset,
    progress: &AnnotatorProgress,
    state: SessionState,
    catalog: &CategoryCatalog,
    coder: &AnnotatorId,
    category: &str,
) -> Result<Transition, ValidationError> {
    let row = presented_row(dataset, state)?;
    let category = catalog.validate(row, category)?;

    let mut progress = progress.clone();
    let upsert = progress.upsert(row.key.clone(), category, coder.as_str());
    let state = resolve(dataset, &progress);
    debug!("{} labeled {} as {category:?} ({upsert:?}); now {state:?}", coder, row.key);
    Ok(Transition {
        state,
        progress,
        upsert,
    })
}

/// Row currently on screen for a state.
pub fn presented_row(
    dataset: &MasterDataset,
    state: SessionState,
) -> Result<&ResponseRow, ValidationError> {
    state
        .presented_index()
        .and_then(|index| dataset.get(index))
        .ok_or(ValidationError::NothingToSubmit)
}

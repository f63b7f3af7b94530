//! Stateful wrapper around the pure session functions.
//!
//! Holds the coder, their progress and the current dataset, persists after
//! every accepted submission, and only commits new state once the write has
//! succeeded.

use std::path::Path;

use tracing::{info, warn};

use super::{SessionError, SessionState, ValidationError, presented_row, resolve};
use crate::catalog::CategoryCatalog;
use crate::dataset::{MasterDataset, ResponseRow, load_dataset};
use crate::progress::merge::{orphaned_keys, write_merged_file};
use crate::progress::store::write_progress_file;
use crate::progress::{AnnotatorId, AnnotatorProgress, ProgressCounter, ProgressStore};

/// One coder's labeling session.
#[derive(Debug)]
pub struct SessionController {
    store: ProgressStore,
    catalog: CategoryCatalog,
    coder: Option<(AnnotatorId, AnnotatorProgress)>,
    dataset: Option<MasterDataset>,
    state: SessionState,
}

impl SessionController {
    /// New session with no coder and no dataset.
    pub fn new(store: ProgressStore, catalog: CategoryCatalog) -> Self {
        Self {
            store,
            catalog,
            coder: None,
            dataset: None,
            state: SessionState::AwaitingInput,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Active coder, if set.
    pub fn coder(&self) -> Option<&AnnotatorId> {
        self.coder.as_ref().map(|(id, _)| id)
    }

    /// Active coder's progress, if a coder is set.
    pub fn progress(&self) -> Option<&AnnotatorProgress> {
        self.coder.as_ref().map(|(_, progress)| progress)
    }

    /// Loaded dataset, if any.
    pub fn dataset(&self) -> Option<&MasterDataset> {
        self.dataset.as_ref()
    }

    /// Catalog used for validation and choices.
    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Backing progress store.
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Switch to a coder, loading their saved progress from disk.
    ///
    /// On failure (invalid id, corrupt file) the previous coder stays active.
    pub fn set_coder(&mut self, raw: &str) -> Result<SessionState, SessionError> {
        let id = AnnotatorId::parse(raw)?;
        let progress = self.store.load(&id)?;
        info!("Coder {id} active with {} saved record(s)", progress.len());
        self.coder = Some((id, progress));
        self.report_orphans();
        Ok(self.refresh())
    }

    /// Drop the active coder; the session waits for input again.
    pub fn clear_coder(&mut self) {
        self.coder = None;
        self.refresh();
    }

    /// Replace the master dataset and recompute the next row.
    pub fn set_dataset(&mut self, dataset: MasterDataset) -> SessionState {
        self.dataset = Some(dataset);
        self.report_orphans();
        self.refresh()
    }

    /// Load a dataset file; on failure the previous dataset stays active.
    pub fn open_dataset(&mut self, path: &Path) -> Result<SessionState, SessionError> {
        let dataset = load_dataset(path)?;
        Ok(self.set_dataset(dataset))
    }

    /// Row awaiting a category, if any.
    pub fn current_row(&self) -> Option<&ResponseRow> {
        let dataset = self.dataset.as_ref()?;
        presented_row(dataset, self.state).ok()
    }

    /// Choices for the presented row.
    pub fn current_choices(&self) -> Result<&[String], ValidationError> {
        let row = self.current_row().ok_or(ValidationError::NothingToSubmit)?;
        self.catalog.choices_for(row)
    }

    /// Label the presented row, persist, and advance.
    ///
    /// Nothing changes in memory unless the progress file was written.
    pub fn submit(&mut self, category: &str) -> Result<SessionState, SessionError> {
        let dataset = self.dataset.as_ref().ok_or(ValidationError::MissingInput {
            what: "a dataset",
        })?;
        let (id, progress) = self.coder.as_ref().ok_or(ValidationError::MissingInput {
            what: "a coder ID",
        })?;
        let transition = super::submit(dataset, progress, self.state, &self.catalog, id, category)?;
        self.store.persist(id, &transition.progress)?;

        if let Some((_, progress)) = self.coder.as_mut() {
            *progress = transition.progress;
        }
        self.state = transition.state;
        if self.state == SessionState::Complete {
            info!("All rows labeled for the current dataset");
        }
        Ok(self.state)
    }

    /// Done/total for the active coder against the current dataset.
    pub fn counter(&self) -> Option<ProgressCounter> {
        let dataset = self.dataset.as_ref()?;
        let progress = self.progress()?;
        Some(progress.counter(dataset))
    }

    /// Write a copy of the coder's progress file to `dest`.
    pub fn export_progress(&self, dest: &Path) -> Result<(), SessionError> {
        let progress = self.progress().ok_or(ValidationError::MissingInput {
            what: "a coder ID",
        })?;
        write_progress_file(progress, dest)?;
        info!("Exported {} progress record(s) to {}", progress.len(), dest.display());
        Ok(())
    }

    /// Write the dataset with the coder's labels merged in to `dest`.
    pub fn export_merged(&self, dest: &Path) -> Result<(), SessionError> {
        let dataset = self.dataset.as_ref().ok_or(ValidationError::MissingInput {
            what: "a dataset",
        })?;
        let progress = self.progress().ok_or(ValidationError::MissingInput {
            what: "a coder ID",
        })?;
        write_merged_file(dataset, progress, dest)?;
        info!("Exported merged dataset ({} rows) to {}", dataset.len(), dest.display());
        Ok(())
    }

    fn refresh(&mut self) -> SessionState {
        self.state = match (&self.dataset, &self.coder) {
            (Some(dataset), Some((_, progress))) => resolve(dataset, progress),
            _ => SessionState::AwaitingInput,
        };
        self.state
    }

    fn report_orphans(&self) {
        if let (Some(dataset), Some((id, progress))) = (&self.dataset, &self.coder) {
            let orphans = orphaned_keys(dataset, progress);
            if !orphans.is_empty() {
                warn!(
                    "{} saved label(s) for {id} refer to rows not in the current dataset; they are kept but not shown",
                    orphans.len()
                );
            }
        }
    }
}

//! Bridges the labeling session to the egui UI: file dialogs, status messages
//! and remembered settings.

use std::path::{Path, PathBuf};

use rfd::FileDialog;
use tracing::warn;

use crate::config::{self, AppSettings, ConfigError};
use crate::dataset::ResponseRow;
use crate::egui_app::state::{StatusTone, UiState, status_badge};
use crate::progress::ProgressCounter;
use crate::session::{SessionController, SessionError, SessionState, ValidationError};

const DATASET_EXTENSIONS: [&str; 7] = ["csv", "txt", "xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Maintains app state and bridges core logic to the egui UI.
pub struct EguiController {
    /// Widget state read and written by the renderer.
    pub ui: UiState,
    session: SessionController,
    settings: AppSettings,
    config_path: Option<PathBuf>,
}

impl EguiController {
    /// Controller around an existing session; settings are saved to `config_path` when set.
    pub fn new(
        session: SessionController,
        settings: AppSettings,
        config_path: Option<PathBuf>,
    ) -> Self {
        let mut ui = UiState::default();
        ui.coder_input = settings.last_coder.clone().unwrap_or_default();
        Self {
            ui,
            session,
            settings,
            config_path,
        }
    }

    /// Load persisted config and build the session it describes.
    pub fn from_configuration() -> Result<Self, String> {
        let path = config::config_path().map_err(|err| err.to_string())?;
        let settings = config::load_from(&path).map_err(|err| err.to_string())?;
        let catalog = settings
            .category_catalog()
            .map_err(|err| err.to_string())?;
        let store = config::progress_store(&settings).map_err(|err| err.to_string())?;
        let session = SessionController::new(store, catalog);
        Ok(Self::new(session, settings, Some(path)))
    }

    /// Reapply the coder id and dataset remembered from the last run.
    pub fn restore_last_session(&mut self) {
        if !self.ui.coder_input.trim().is_empty() {
            self.apply_coder_input();
        }
        if let Some(path) = self.settings.last_dataset.clone() {
            if path.is_file() {
                self.open_dataset(&path);
            } else {
                self.set_status(
                    format!("Last dataset {} is no longer available", path.display()),
                    StatusTone::Warning,
                );
            }
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// `done / total` for the loaded dataset and coder.
    pub fn counter(&self) -> Option<ProgressCounter> {
        self.session.counter()
    }

    /// Row being presented, if any.
    pub fn current_row(&self) -> Option<&ResponseRow> {
        self.session.current_row()
    }

    /// Categories offered for the presented row.
    pub fn current_choices(&self) -> Result<&[String], ValidationError> {
        self.session.current_choices()
    }

    /// Display form of the active coder id.
    pub fn coder_label(&self) -> Option<String> {
        self.session.coder().map(|id| id.to_string())
    }

    /// File name of the loaded dataset with its row count.
    pub fn dataset_label(&self) -> Option<String> {
        let dataset = self.session.dataset()?;
        let name = dataset
            .source
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".into());
        Some(format!("{name} ({} rows)", dataset.len()))
    }

    /// Apply the coder field; an empty field clears the coder.
    pub fn apply_coder_input(&mut self) {
        let raw = self.ui.coder_input.trim().to_string();
        if raw.is_empty() {
            self.session.clear_coder();
            self.ui.selected_category = None;
            self.set_status("Enter your coder ID to continue", StatusTone::Idle);
            return;
        }
        if self.session.coder().is_some_and(|id| id.as_str() == raw) {
            return;
        }
        match self.session.set_coder(&raw) {
            Ok(state) => {
                self.ui.selected_category = None;
                self.settings.last_coder = Some(raw.clone());
                self.persist_settings();
                let saved = self.session.progress().map_or(0, |p| p.len());
                self.report_state(state, format!("Coder {raw} loaded with {saved} saved label(s)"));
            }
            Err(err) => self.report_error(err),
        }
    }

    /// Pick a dataset file and load it.
    pub fn open_dataset_via_dialog(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("Survey responses", &DATASET_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        self.open_dataset(&path);
    }

    /// Load a dataset file into the session, keeping the previous one on failure.
    pub fn open_dataset(&mut self, path: &Path) {
        match self.session.open_dataset(path) {
            Ok(state) => {
                self.ui.selected_category = None;
                self.settings.last_dataset = Some(path.to_path_buf());
                self.persist_settings();
                let dropped = self
                    .session
                    .dataset()
                    .map_or(0, |dataset| dataset.dropped_empty());
                let mut message = format!("Loaded {}", path.display());
                if dropped > 0 {
                    message.push_str(&format!(" ({dropped} empty response(s) skipped)"));
                }
                self.report_state(state, message);
            }
            Err(err) => self.report_error(err),
        }
    }

    /// Submit the selected category for the presented row.
    pub fn submit_selected(&mut self) {
        let category = self.ui.selected_category.clone().unwrap_or_default();
        match self.session.submit(&category) {
            Ok(state) => {
                self.ui.selected_category = None;
                self.report_state(state, format!("Saved \"{category}\""));
            }
            Err(err) => self.report_error(err),
        }
    }

    /// Pick a destination and copy the coder's progress file there.
    pub fn export_progress_via_dialog(&mut self) {
        let Some(coder) = self.session.coder() else {
            self.set_status("Enter your coder ID first", StatusTone::Warning);
            return;
        };
        let default_name = self
            .session
            .store()
            .path_for(coder)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "classified_responses.csv".into());
        let Some(dest) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name(default_name)
            .save_file()
        else {
            return;
        };
        self.export_progress(&dest);
    }

    /// Write the coder's progress file to `dest`.
    pub fn export_progress(&mut self, dest: &Path) {
        match self.session.export_progress(dest) {
            Ok(()) => self.set_status(
                format!("Progress exported to {}", dest.display()),
                StatusTone::Info,
            ),
            Err(err) => self.report_error(err),
        }
    }

    /// Pick a destination and write the merged dataset there.
    pub fn export_merged_via_dialog(&mut self) {
        let Some(dest) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name("merged_responses.csv")
            .save_file()
        else {
            return;
        };
        self.export_merged(&dest);
    }

    /// Write the dataset with the coder's labels merged in to `dest`.
    pub fn export_merged(&mut self, dest: &Path) {
        match self.session.export_merged(dest) {
            Ok(()) => self.set_status(
                format!("Merged dataset exported to {}", dest.display()),
                StatusTone::Info,
            ),
            Err(err) => self.report_error(err),
        }
    }

    fn report_state(&mut self, state: SessionState, message: String) {
        match state {
            SessionState::AwaitingInput => self.set_status(message, StatusTone::Idle),
            SessionState::Presenting(_) => self.set_status(message, StatusTone::Info),
            SessionState::Complete => self.set_status(
                format!("{message}. All responses are labeled."),
                StatusTone::Info,
            ),
        }
    }

    fn report_error(&mut self, err: SessionError) {
        let tone = match &err {
            SessionError::Validation(_) => StatusTone::Warning,
            _ => StatusTone::Error,
        };
        if tone == StatusTone::Error {
            warn!("{err}");
        }
        self.set_status(err.to_string(), tone);
    }

    fn persist_settings(&mut self) {
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        if let Err(err) = config::save_to_path(&self.settings, path) {
            self.warn_settings_not_saved(err);
        }
    }

    fn warn_settings_not_saved(&mut self, err: ConfigError) {
        warn!("Settings not saved: {err}");
        self.set_status(format!("Settings not saved: {err}"), StatusTone::Warning);
    }

    fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        let (label, color) = status_badge(tone);
        self.ui.status.text = text.into();
        self.ui.status.badge_label = label;
        self.ui.status.badge_color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CategoryCatalog, OTHER};
    use crate::progress::ProgressStore;
    use tempfile::tempdir;

    const MASTER: &str = "ResponseId,type,item,value\nR1,positive,1,Skills\nR2,negative,1,Costs\n";

    fn controller(root: &Path) -> EguiController {
        let session = SessionController::new(
            ProgressStore::new(root.join("progress")),
            CategoryCatalog::default(),
        );
        EguiController::new(
            session,
            AppSettings::default(),
            Some(root.join(config::CONFIG_FILE_NAME)),
        )
    }

    #[test]
    fn remembers_coder_and_dataset_in_settings() {
        let root = tempdir().unwrap();
        let master = root.path().join("master.csv");
        std::fs::write(&master, MASTER).unwrap();
        let mut controller = controller(root.path());

        controller.ui.coder_input = " AB ".into();
        controller.apply_coder_input();
        controller.open_dataset(&master);
        assert_eq!(controller.state(), SessionState::Presenting(0));
        assert_eq!(controller.dataset_label().as_deref(), Some("master.csv (2 rows)"));

        let saved = config::load_from(&root.path().join(config::CONFIG_FILE_NAME)).unwrap();
        assert_eq!(saved.last_coder.as_deref(), Some("AB"));
        assert_eq!(saved.last_dataset.as_deref(), Some(master.as_path()));
    }

    #[test]
    fn placeholder_submit_warns_and_keeps_row() {
        let root = tempdir().unwrap();
        let master = root.path().join("master.csv");
        std::fs::write(&master, MASTER).unwrap();
        let mut controller = controller(root.path());
        controller.ui.coder_input = "AB".into();
        controller.apply_coder_input();
        controller.open_dataset(&master);

        controller.submit_selected();
        assert_eq!(controller.ui.status.badge_label, "Warning");
        assert_eq!(controller.state(), SessionState::Presenting(0));

        controller.ui.selected_category = Some(OTHER.into());
        controller.submit_selected();
        assert_eq!(controller.state(), SessionState::Presenting(1));
        assert_eq!(controller.ui.selected_category, None);
        assert_eq!(controller.counter().map(|c| c.done), Some(1));
    }

    #[test]
    fn bad_dataset_reports_error_and_keeps_previous() {
        let root = tempdir().unwrap();
        let master = root.path().join("master.csv");
        std::fs::write(&master, MASTER).unwrap();
        let broken = root.path().join("broken.csv");
        std::fs::write(&broken, "ResponseId,value\nR1,x\n").unwrap();
        let mut controller = controller(root.path());
        controller.open_dataset(&master);
        controller.open_dataset(&broken);
        assert_eq!(controller.ui.status.badge_label, "Error");
        assert!(controller.ui.status.text.contains("type"));
        assert_eq!(controller.dataset_label().as_deref(), Some("master.csv (2 rows)"));
    }
}

//! Shared state types for the egui UI.

use egui::Color32;

/// Top-level UI model consumed by the egui renderer.
#[derive(Clone, Debug)]
pub struct UiState {
    /// Text in the coder id field; applied on Enter or focus loss.
    pub coder_input: String,
    /// Category picked in the selector; `None` shows the placeholder.
    pub selected_category: Option<String>,
    /// Status bar text and badge.
    pub status: StatusBarState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            coder_input: String::new(),
            selected_category: None,
            status: StatusBarState::idle(),
        }
    }
}

/// Status badge + text shown in the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusBarState {
    /// Main status message text.
    pub text: String,
    /// Badge label shown next to the status.
    pub badge_label: String,
    /// Badge color.
    pub badge_color: Color32,
}

impl StatusBarState {
    /// Default status shown before a coder and dataset are chosen.
    pub fn idle() -> Self {
        let (badge_label, badge_color) = status_badge(StatusTone::Idle);
        Self {
            text: "Enter your coder ID and open a dataset to begin".into(),
            badge_label,
            badge_color,
        }
    }
}

/// Severity shown by the status bar badge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    /// Nothing is happening yet.
    Idle,
    /// Routine progress such as a saved label.
    Info,
    /// Something the coder should notice but can work past.
    Warning,
    /// An action failed.
    Error,
}

pub(crate) fn status_badge(tone: StatusTone) -> (String, Color32) {
    match tone {
        StatusTone::Idle => ("Idle".into(), Color32::from_rgb(42, 42, 42)),
        StatusTone::Info => ("Info".into(), Color32::from_rgb(64, 140, 112)),
        StatusTone::Warning => ("Warning".into(), Color32::from_rgb(192, 138, 43)),
        StatusTone::Error => ("Error".into(), Color32::from_rgb(192, 57, 43)),
    }
}

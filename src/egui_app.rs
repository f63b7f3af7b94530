//! egui front end for the labeling session.

/// Bridges the session to UI actions.
pub mod controller;
/// UI state shared between controller and renderer.
pub mod state;
/// egui renderer.
pub mod ui;

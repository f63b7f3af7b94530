//! Library exports for reuse in benchmarks, tests and helper binaries.
#![warn(missing_docs)]
/// Application directory resolution.
pub mod app_dirs;
/// Temp-file-then-rename writes.
pub mod atomic_write;
/// Category catalogs per response type.
pub mod catalog;
/// Persisted TOML settings.
pub mod config;
/// Master dataset loading and ordering.
pub mod dataset;
/// Shared egui UI modules.
pub mod egui_app;
/// Tracing setup.
pub mod logging;
/// Per-coder progress files.
pub mod progress;
/// Labeling session state machine.
pub mod session;

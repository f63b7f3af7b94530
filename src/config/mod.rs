//! `config.toml` in the app root: remembered inputs, the progress directory and
//! optional category overrides.

use crate::app_dirs;
use crate::progress::{ProgressError, ProgressStore};

mod load;
mod save;
mod types;


/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub use load::{config_path, load_from, load_or_default};
pub use save::{save, save_to_path};
pub use types::{AppSettings, CatalogSettings, ConfigError};

/// Progress store for the configured directory, or the default one.
pub fn progress_store(settings: &AppSettings) -> Result<ProgressStore, ProgressError> {
    match &settings.progress_dir {
        Some(dir) => Ok(ProgressStore::new(dir.clone())),
        None => ProgressStore::open_default(),
    }
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}

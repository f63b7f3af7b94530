use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CategoryCatalog;
use crate::catalog::{DEFAULT_NEGATIVE, DEFAULT_POSITIVE};

/// Errors that may occur while loading or saving app configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        /// Directory path that failed to create.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write the config file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize config to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML serialization error.
        source: toml::ser::Error,
    },
    /// A `[catalog]` override is unusable.
    #[error("Invalid catalog override for {kind} responses: {reason}")]
    InvalidCatalog {
        /// `positive` or `negative`.
        kind: &'static str,
        /// What was wrong.
        reason: String,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Settings persisted in `config.toml`.
///
/// Config keys (TOML): `progress_dir`, `last_coder`, `last_dataset`, `catalog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Directory for progress files; defaults to `.surveycoder/progress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_dir: Option<PathBuf>,
    /// Coder id entered in the previous session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_coder: Option<String>,
    /// Dataset opened in the previous session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_dataset: Option<PathBuf>,
    /// `[catalog]` table overriding the built-in category lists.
    #[serde(default)]
    pub catalog: CatalogSettings,
}

/// Optional replacements for the built-in substantive categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Substantive categories offered for positive responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<Vec<String>>,
    /// Substantive categories offered for negative responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<Vec<String>>,
}

impl AppSettings {
    /// Trim string fields and forget blank ones.
    pub(crate) fn normalized(mut self) -> Self {
        self.last_coder = self
            .last_coder
            .map(|coder| coder.trim().to_string())
            .filter(|coder| !coder.is_empty());
        self.progress_dir = self.progress_dir.filter(|dir| !dir.as_os_str().is_empty());
        self.last_dataset = self.last_dataset.filter(|path| !path.as_os_str().is_empty());
        self
    }

    /// Category catalog with any overrides applied.
    pub fn category_catalog(&self) -> Result<CategoryCatalog, ConfigError> {
        let positive = override_or_default(&self.catalog.positive, &DEFAULT_POSITIVE, "positive")?;
        let negative = override_or_default(&self.catalog.negative, &DEFAULT_NEGATIVE, "negative")?;
        Ok(CategoryCatalog::new(positive, negative))
    }
}

fn override_or_default(
    entries: &Option<Vec<String>>,
    defaults: &[&str],
    kind: &'static str,
) -> Result<Vec<String>, ConfigError> {
    let Some(entries) = entries else {
        return Ok(defaults.iter().map(|s| s.to_string()).collect());
    };
    if entries.is_empty() {
        return Err(ConfigError::InvalidCatalog {
            kind,
            reason: "list is empty".into(),
        });
    }
    if let Some(position) = entries.iter().position(|entry| entry.trim().is_empty()) {
        return Err(ConfigError::InvalidCatalog {
            kind,
            reason: format!("entry {} is blank", position + 1),
        });
    }
    Ok(entries.clone())
}

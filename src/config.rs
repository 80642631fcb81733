//! Configuration and directory resolution.
//!
//! The config file is YAML and every key is optional:
//!
//! ```yaml
//! storage:
//!   backend: sqlite        # file (default) or sqlite
//!   data_dir: ~/todos      # defaults to dirs::data_dir()/todolist
//! view:
//!   page_size: 10          # 5, 10, 15 or 20
//!   sort: desc             # asc or desc
//! export:
//!   file_name: todo-list.xlsx
//! ```
//!
//! `TODOLIST_CONFIG_DIR` and `TODOLIST_DATA_DIR` override the platform
//! directories.

use crate::filter::{PageSize, SortOrder};
use crate::slot::{FileSlot, Slot, SqliteSlot};
use crate::transfer::EXPORT_FILE_NAME;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "todolist";
const CONFIG_FILE: &str = "config.yml";
const SQLITE_FILE: &str = "todolist.db";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub view: ViewConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

/// Initial list view settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: PageSize,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: EXPORT_FILE_NAME.to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default location if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = config_dir().join(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    debug!(path = ?default_path, "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!(path = ?path, backend = ?config.storage.backend, "Loaded config");
        Ok(config)
    }

    /// Directory holding the task storage
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(data_dir)
    }

    /// Open the configured storage backend
    pub fn open_slot(&self) -> Result<Box<dyn Slot>> {
        let dir = self.data_dir();
        let slot: Box<dyn Slot> = match self.storage.backend {
            Backend::File => Box::new(FileSlot::open(&dir)?),
            Backend::Sqlite => Box::new(SqliteSlot::open(dir.join(SQLITE_FILE))?),
        };
        debug!(dir = ?dir, backend = ?self.storage.backend, "Opened storage");
        Ok(slot)
    }
}

/// Config directory, `dirs::config_dir()/todolist` unless `TODOLIST_CONFIG_DIR` is set
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("TODOLIST_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_NAME))
}

/// Data directory, `dirs::data_dir()/todolist` unless `TODOLIST_DATA_DIR` is set
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("TODOLIST_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_NAME))
}

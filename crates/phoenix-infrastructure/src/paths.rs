//! Path management for Phoenix configuration and stores.
//!
//! ```text
//! ~/.config/phoenix/
//! └── config.toml
//!
//! <data_dir>/                  # default ~/.local/share/phoenix
//! ├── LOCAL/
//! │   ├── worlds/<world_id>/{world,users,artifacts,chats}.json
//! │   └── blobs/<blob_id>/{blob.json,<filename>}
//! ├── BETA/ ...
//! ├── PROD/ ...
//! ├── seeds/                   # default packages root
//! └── backups/                 # default backup directory
//! ```

use phoenix_core::config::PhoenixConfig;
use phoenix_core::world::is_path_safe;
use phoenix_core::{Environment, PhoenixError};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "phoenix";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for PhoenixError {
    fn from(e: PathError) -> Self {
        PhoenixError::config(e.to_string())
    }
}

/// Platform locations of Phoenix files.
pub struct PhoenixPaths;

impl PhoenixPaths {
    /// Returns the configuration directory (e.g. `~/.config/phoenix/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the data directory (e.g. `~/.local/share/phoenix/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}

/// Resolved store locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub data_dir: PathBuf,
    pub seeds_dir: PathBuf,
    pub backups_dir: PathBuf,
}

impl StorePaths {
    /// Places the packages root and backups under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            seeds_dir: data_dir.join("seeds"),
            backups_dir: data_dir.join("backups"),
            data_dir,
        }
    }

    /// Resolves every unset directory of `config` against the platform
    /// data directory.
    pub fn from_config(config: &PhoenixConfig) -> Result<Self, PathError> {
        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => PhoenixPaths::data_dir()?,
        };
        let mut paths = Self::new(data_dir);
        if let Some(dir) = &config.seeds_dir {
            paths.seeds_dir = dir.clone();
        }
        if let Some(dir) = &config.backups_dir {
            paths.backups_dir = dir.clone();
        }
        Ok(paths)
    }

    pub fn environment_dir(&self, environment: Environment) -> PathBuf {
        environment_dir(&self.data_dir, environment)
    }
}

/// `<root>/<ENV>`
pub fn environment_dir(root: &Path, environment: Environment) -> PathBuf {
    root.join(environment.dir_name())
}

/// Whether `name` can be used as a single directory name.
pub fn is_safe_segment(name: &str) -> bool {
    is_path_safe(name)
}

//! Backup file storage.
//!
//! Backups are single JSON files named `backup_<ENV>_<YYYYMMDD_HHMMSS>.json`.

use crate::storage::StagedFile;
use phoenix_core::seed::BackupFile;
use phoenix_core::{PhoenixError, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BackupStorage {
    dir: PathBuf,
}

impl BackupStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name for a backup; a numeric suffix is added when a backup of
    /// the same environment was already taken within the same second.
    fn file_name_for(&self, backup: &BackupFile) -> PathBuf {
        let stem = format!(
            "backup_{}_{}",
            backup.environment,
            backup.timestamp.format("%Y%m%d_%H%M%S")
        );
        let mut path = self.dir.join(format!("{}.json", stem));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{}_{}.json", stem, n));
            n += 1;
        }
        path
    }

    /// Writes a backup and returns its path.
    pub fn save(&self, backup: &BackupFile) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| PhoenixError::store(format!("backup dir {}", self.dir.display()), e))?;
        let path = self.file_name_for(backup);
        let json = serde_json::to_vec_pretty(backup)?;
        StagedFile::write(&path, &json)
            .and_then(|staged| staged.commit())
            .map_err(|e| PhoenixError::store(format!("backup {}", path.display()), e))?;
        Ok(path)
    }

    /// Reads a backup file, checking its shape before decoding it.
    pub fn load(path: &Path) -> Result<BackupFile> {
        if !path.is_file() {
            return Err(PhoenixError::not_found("backup", path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&content)
            .map_err(|e| PhoenixError::structural(path, format!("malformed backup: {}", e)))?;
        BackupFile::from_value(raw, path)
    }

    /// Backup files in the directory, oldest name first.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .map(|name| name.to_string_lossy())
                        .is_some_and(|name| name.starts_with("backup_") && name.ends_with(".json"))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use phoenix_core::Environment;
    use tempfile::TempDir;

    fn backup() -> BackupFile {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        BackupFile::from_worlds(Environment::Beta, timestamp, Vec::new()).unwrap()
    }

    #[test]
    fn test_save_names_file_by_environment_and_time() {
        let temp_dir = TempDir::new().unwrap();
        let storage = BackupStorage::new(temp_dir.path().join("backups"));

        let first = storage.save(&backup()).unwrap();
        let second = storage.save(&backup()).unwrap();
        assert!(first.ends_with("backup_BETA_20240501_123000.json"));
        assert!(second.ends_with("backup_BETA_20240501_123000_1.json"));
        assert_eq!(storage.list().unwrap(), vec![first.clone(), second]);
        assert_eq!(BackupStorage::load(&first).unwrap(), backup());
    }

    #[test]
    fn test_load_rejects_bad_shape() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup.json");
        fs::write(&path, r#"{"worlds": [], "users": [], "chats": []}"#).unwrap();
        let err = BackupStorage::load(&path).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("artifacts"));

        fs::write(&path, "not json").unwrap();
        assert!(BackupStorage::load(&path).unwrap_err().is_structural());

        assert!(BackupStorage::load(&temp_dir.path().join("missing.json"))
            .unwrap_err()
            .is_not_found());
    }
}

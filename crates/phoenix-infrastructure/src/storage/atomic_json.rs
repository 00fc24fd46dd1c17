//! Atomic JSON file operations.
//!
//! Every store document goes through [`AtomicJsonFile`]: writes land in a
//! hidden temp file that is fsynced and then renamed over the target.
//! [`AtomicJsonFile::stage`] splits that into two steps so several
//! documents can be fully written before any of them becomes visible.

use phoenix_core::PhoenixError;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Errors that can occur during atomic JSON operations.
#[derive(Debug)]
pub enum AtomicJsonError {
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON serialization/deserialization error.
    JsonError(serde_json::Error),
    /// File locking error.
    LockError(String),
}

impl std::fmt::Display for AtomicJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicJsonError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicJsonError::JsonError(e) => write!(f, "JSON error: {}", e),
            AtomicJsonError::LockError(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicJsonError {}

impl From<std::io::Error> for AtomicJsonError {
    fn from(e: std::io::Error) -> Self {
        AtomicJsonError::IoError(e)
    }
}

impl From<serde_json::Error> for AtomicJsonError {
    fn from(e: serde_json::Error) -> Self {
        AtomicJsonError::JsonError(e)
    }
}

impl From<AtomicJsonError> for PhoenixError {
    fn from(e: AtomicJsonError) -> Self {
        match e {
            AtomicJsonError::IoError(e) => PhoenixError::from(e),
            AtomicJsonError::JsonError(e) => PhoenixError::from(e),
            AtomicJsonError::LockError(message) => PhoenixError::store("file lock", message),
        }
    }
}

/// A handle to a JSON document replaced atomically on every save.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the document.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>, AtomicJsonError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Saves the document atomically.
    pub fn save(&self, data: &T) -> Result<(), AtomicJsonError> {
        self.stage(data)?.commit()
    }

    /// Writes the document to a temp file next to the target without
    /// replacing the target yet.
    pub fn stage(&self, data: &T) -> Result<StagedFile, AtomicJsonError> {
        let bytes = serde_json::to_vec_pretty(data)?;
        StagedFile::write(&self.path, &bytes)
    }
}

/// A fully written, fsynced temp file waiting to replace its target.
///
/// Dropping it without calling [`StagedFile::commit`] removes the temp file
/// and leaves the target untouched.
#[derive(Debug)]
pub struct StagedFile {
    tmp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Writes `bytes` to a unique temp file in the target's directory.
    pub fn write(target: &Path, bytes: &[u8]) -> Result<Self, AtomicJsonError> {
        let parent = target.parent().ok_or_else(|| {
            AtomicJsonError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        })?;
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }

        let file_name = target.file_name().ok_or_else(|| {
            AtomicJsonError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no file name",
            ))
        })?;
        let tmp_path = parent.join(format!(
            ".{}.{}.tmp",
            file_name.to_string_lossy(),
            uuid::Uuid::new_v4().simple()
        ));

        let staged = Self {
            tmp_path,
            target: target.to_path_buf(),
            committed: false,
        };
        let mut tmp_file = File::create(&staged.tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
        Ok(staged)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Renames the temp file over the target.
    pub fn commit(mut self) -> Result<(), AtomicJsonError> {
        fs::rename(&self.tmp_path, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// A file lock guard that releases the lock when dropped.
pub struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    /// Acquires an exclusive advisory lock next to `path`.
    pub fn acquire(path: &Path) -> Result<Self, AtomicJsonError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicJsonError::LockError(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        count: u32,
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("counter.json"));

        assert!(file.load().unwrap().is_none());
        file.save(&Counter {
            name: "a".into(),
            count: 1,
        })
        .unwrap();

        assert_eq!(file.load().unwrap().unwrap().count, 1);
        assert!(leftovers(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_dropped_stage_leaves_target_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Counter>::new(temp_dir.path().join("counter.json"));
        file.save(&Counter {
            name: "kept".into(),
            count: 1,
        })
        .unwrap();

        let staged = file
            .stage(&Counter {
                name: "discarded".into(),
                count: 2,
            })
            .unwrap();
        assert_eq!(leftovers(temp_dir.path()).len(), 1);
        drop(staged);

        assert_eq!(file.load().unwrap().unwrap().name, "kept");
        assert!(leftovers(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.json");
        fs::write(&path, "{ not json").unwrap();
        let file = AtomicJsonFile::<Counter>::new(path);
        assert!(matches!(file.load(), Err(AtomicJsonError::JsonError(_))));
    }
}

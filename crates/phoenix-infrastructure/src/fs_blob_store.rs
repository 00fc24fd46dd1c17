//! File-system BlobStore implementation.
//!
//! ```text
//! <root>/<ENV>/blobs/<blob_id>/
//! ├── blob.json      # BlobReference, path relative to this directory
//! └── <filename>
//! ```

use crate::paths::{environment_dir, is_safe_segment};
use crate::storage::{AtomicJsonFile, StagedFile};
use phoenix_core::blob::{BlobReference, BlobStore};
use phoenix_core::{Environment, PhoenixError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const REFERENCE_FILE: &str = "blob.json";
const FALLBACK_FILENAME: &str = "blob.bin";

#[derive(Debug, Clone)]
pub struct FileSystemBlobStore {
    root: PathBuf,
}

impl FileSystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blobs_dir(&self, environment: Environment) -> PathBuf {
        environment_dir(&self.root, environment).join("blobs")
    }

    fn blob_dir(&self, environment: Environment, blob_id: &str) -> Result<PathBuf> {
        if !is_safe_segment(blob_id) {
            return Err(PhoenixError::validation(format!(
                "blob id '{}' cannot name a directory",
                blob_id
            )));
        }
        Ok(self.blobs_dir(environment).join(blob_id))
    }

    fn reference_file(dir: &Path) -> AtomicJsonFile<BlobReference> {
        AtomicJsonFile::new(dir.join(REFERENCE_FILE))
    }
}

/// The last path component of `filename`, or a fallback name.
fn stored_filename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| name != REFERENCE_FILE && is_safe_segment(name))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Content type of a blob, guessed from its filename when not given.
pub fn content_type_for(blob: &BlobReference) -> String {
    if blob.content_type.trim().is_empty() {
        mime_guess::from_path(&blob.filename)
            .first_or_octet_stream()
            .to_string()
    } else {
        blob.content_type.clone()
    }
}

impl BlobStore for FileSystemBlobStore {
    fn upload_blob(
        &self,
        environment: Environment,
        blob: &BlobReference,
        bytes: &[u8],
    ) -> Result<()> {
        let dir = self.blob_dir(environment, &blob.id)?;
        let previous = self.find_blob(environment, &blob.id)?;
        let filename = stored_filename(&blob.filename);

        let stored = BlobReference {
            id: blob.id.clone(),
            filename: blob.filename.clone(),
            content_type: content_type_for(blob),
            size: bytes.len() as u64,
            path: filename.clone(),
            owner_id: blob.owner_id.clone(),
        };

        let context = format!("blob '{}' in {}", blob.id, environment);
        StagedFile::write(&dir.join(&filename), bytes)
            .and_then(|staged| staged.commit())
            .map_err(|e| PhoenixError::store(&context, e))?;
        Self::reference_file(&dir)
            .save(&stored)
            .map_err(|e| PhoenixError::store(&context, e))?;

        if let Some(previous) = previous {
            if previous.path != stored.path {
                let _ = fs::remove_file(dir.join(&previous.path));
            }
        }

        tracing::debug!(
            blob_id = %blob.id,
            environment = %environment,
            size = stored.size,
            "Stored blob"
        );
        Ok(())
    }

    fn download_blob(&self, environment: Environment, blob_id: &str) -> Result<Vec<u8>> {
        let reference = self
            .find_blob(environment, blob_id)?
            .ok_or_else(|| PhoenixError::not_found("blob", blob_id))?;
        let dir = self.blob_dir(environment, blob_id)?;
        fs::read(dir.join(&reference.path)).map_err(|e| {
            PhoenixError::store(format!("blob '{}' in {}", blob_id, environment), e)
        })
    }

    fn delete_blob(&self, environment: Environment, blob_id: &str) -> Result<()> {
        let dir = self.blob_dir(environment, blob_id)?;
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| {
                PhoenixError::store(format!("blob '{}' in {}", blob_id, environment), e)
            })?;
        }
        Ok(())
    }

    fn find_blob(&self, environment: Environment, blob_id: &str) -> Result<Option<BlobReference>> {
        let dir = self.blob_dir(environment, blob_id)?;
        Self::reference_file(&dir).load().map_err(|e| {
            PhoenixError::store(format!("blob '{}' in {}", blob_id, environment), e)
        })
    }

    fn list_blobs(&self, environment: Environment) -> Result<Vec<BlobReference>> {
        let dir = self.blobs_dir(environment);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut blobs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match Self::reference_file(&entry.path()).load() {
                Ok(Some(reference)) => blobs.push(reference),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Skipping unreadable blob reference"
                    );
                }
            }
        }
        blobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(blobs)
    }
}

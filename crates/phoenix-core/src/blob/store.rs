//! Blob store trait.
//!
//! Boundary to the binary storage backing attachments. The engine only
//! uploads, downloads, lists and deletes through this interface.

use super::model::BlobReference;
use crate::environment::Environment;
use crate::error::Result;

/// Binary attachment storage for one or more environments.
pub trait BlobStore: Send + Sync {
    /// Stores the bytes of a blob, replacing any blob with the same id.
    fn upload_blob(&self, environment: Environment, blob: &BlobReference, bytes: &[u8])
    -> Result<()>;

    /// Reads the bytes of a stored blob.
    ///
    /// Returns `NotFound` if the blob does not exist.
    fn download_blob(&self, environment: Environment, blob_id: &str) -> Result<Vec<u8>>;

    /// Deletes a blob (no-op if absent).
    fn delete_blob(&self, environment: Environment, blob_id: &str) -> Result<()>;

    /// Finds the reference of a stored blob.
    fn find_blob(&self, environment: Environment, blob_id: &str) -> Result<Option<BlobReference>>;

    /// Lists every stored blob, sorted by id.
    fn list_blobs(&self, environment: Environment) -> Result<Vec<BlobReference>>;

    fn exists(&self, environment: Environment, blob_id: &str) -> Result<bool> {
        Ok(self.find_blob(environment, blob_id)?.is_some())
    }
}

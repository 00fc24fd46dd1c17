use serde::{Deserialize, Serialize};

/// Reference to a binary attachment.
///
/// Inside a seed package `path` is relative to the package's `blob/`
/// directory; inside a blob store it is relative to that blob's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobReference {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    pub path: String,
    /// Artifact or conversation that owns the attachment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl BlobReference {
    /// Relative path used for a blob inside a package: `<id>/<filename>`.
    pub fn package_path(id: &str, filename: &str) -> String {
        format!("{}/{}", id, filename)
    }

    /// Returns a copy re-keyed under a new identifier, with the path updated
    /// to match.
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            path: Self::package_path(&id, &self.filename),
            id,
            ..self.clone()
        }
    }
}

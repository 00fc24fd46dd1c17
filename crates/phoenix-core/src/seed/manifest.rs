//! The `seed.json` manifest of a seed package.

use crate::blob::BlobReference;
use crate::environment::Environment;
use crate::error::{PhoenixError, Result};
use crate::world::{CollectionKind, Record, World, WorldMetadata, is_path_safe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// Format version written into new manifests.
pub const SEED_FORMAT_VERSION: &str = "1.0.0";

/// Manifest file name inside a package directory.
pub const MANIFEST_FILE: &str = "seed.json";

/// Attachment directory inside a package directory.
pub const BLOB_DIR: &str = "blob";

/// Generated summary inside a package directory.
pub const README_FILE: &str = "README.md";

/// Where a package was exported from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSource {
    pub world_id: String,
    pub environment: Environment,
    /// Host of the source database, credentials stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

/// World snapshot carried by a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedWorld {
    pub metadata: WorldMetadata,
    #[serde(default)]
    pub users: Vec<Record>,
    #[serde(default)]
    pub artifacts: Vec<Record>,
    #[serde(default)]
    pub chats: Vec<Record>,
    #[serde(default)]
    pub blobs: Vec<BlobReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedManifest {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub source: SeedSource,
    pub world: SeedWorld,
}

impl SeedManifest {
    /// Builds a manifest for a world snapshot at the current format version.
    pub fn new(
        world: World,
        blobs: Vec<BlobReference>,
        database_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let source = SeedSource {
            world_id: world.metadata.id.clone(),
            environment: world.metadata.environment,
            database_url,
        };
        Self {
            version: SEED_FORMAT_VERSION.to_string(),
            created_at,
            source,
            world: SeedWorld {
                metadata: world.metadata,
                users: world.users,
                artifacts: world.artifacts,
                chats: world.chats,
                blobs,
            },
        }
    }

    pub fn world_id(&self) -> &str {
        &self.world.metadata.id
    }

    pub fn collection(&self, kind: CollectionKind) -> &[Record] {
        match kind {
            CollectionKind::Users => &self.world.users,
            CollectionKind::Artifacts => &self.world.artifacts,
            CollectionKind::Chats => &self.world.chats,
        }
    }

    /// Copy of the packaged world without its attachment index.
    pub fn to_world(&self) -> World {
        World {
            metadata: self.world.metadata.clone(),
            users: self.world.users.clone(),
            artifacts: self.world.artifacts.clone(),
            chats: self.world.chats.clone(),
        }
    }

    /// Checks the structural soundness of a manifest read from `path`.
    ///
    /// Rejects an incompatible format version, a missing world id, a source
    /// id that disagrees with the metadata, and attachment paths that could
    /// escape the package's blob directory.
    pub fn check(&self, path: &Path) -> Result<()> {
        let version = semver::Version::parse(&self.version).map_err(|e| {
            PhoenixError::structural(path, format!("invalid version '{}': {}", self.version, e))
        })?;
        let supported = semver::Version::parse(SEED_FORMAT_VERSION)
            .map_err(|e| PhoenixError::internal(e.to_string()))?;
        if version.major != supported.major {
            return Err(PhoenixError::structural(
                path,
                format!(
                    "unsupported seed format {} (expected {}.x)",
                    version, supported.major
                ),
            ));
        }

        if self.world_id().trim().is_empty() {
            return Err(PhoenixError::structural(path, "manifest has no world id"));
        }
        if !is_path_safe(self.world_id()) {
            return Err(PhoenixError::structural(
                path,
                format!("world id '{}' contains path characters", self.world_id()),
            ));
        }
        if self.source.world_id != self.world_id() {
            return Err(PhoenixError::structural(
                path,
                format!(
                    "source world '{}' does not match metadata id '{}'",
                    self.source.world_id,
                    self.world_id()
                ),
            ));
        }

        for blob in &self.world.blobs {
            if blob.id.trim().is_empty() {
                return Err(PhoenixError::structural(path, "blob reference with empty id"));
            }
            if !is_contained(&blob.path) {
                return Err(PhoenixError::structural(
                    path,
                    format!("blob '{}' has unsafe path '{}'", blob.id, blob.path),
                ));
            }
        }
        Ok(())
    }
}

/// Whether a relative path stays inside its base directory.
fn is_contained(relative: &str) -> bool {
    let path = Path::new(relative);
    !relative.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

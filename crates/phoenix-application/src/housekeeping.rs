//! Housekeeping: orphaned attachments, expired worlds and health reporting.

use crate::attachments::WorldReferences;
use chrono::{DateTime, Utc};
use phoenix_core::blob::BlobStore;
use phoenix_core::world::WorldStore;
use phoenix_core::{Environment, Result};
use phoenix_infrastructure::SeedCodec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub environment: Environment,
    pub generated_at: DateTime<Utc>,
    pub worlds: usize,
    pub active_worlds: usize,
    pub templates: usize,
    pub records: usize,
    pub blobs: usize,
    pub blob_bytes: u64,
    pub orphaned_blobs: BTreeSet<String>,
    pub expired_worlds: Vec<String>,
    /// Directories under the packages root without a readable manifest.
    pub invalid_packages: Vec<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.orphaned_blobs.is_empty()
            && self.expired_worlds.is_empty()
            && self.invalid_packages.is_empty()
    }
}

pub struct HousekeepingService {
    world_store: Arc<dyn WorldStore>,
    blob_store: Arc<dyn BlobStore>,
    seeds_dir: PathBuf,
}

impl HousekeepingService {
    pub fn new(
        world_store: Arc<dyn WorldStore>,
        blob_store: Arc<dyn BlobStore>,
        seeds_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            world_store,
            blob_store,
            seeds_dir: seeds_dir.into(),
        }
    }

    /// References of every world in the environment, and the total record count.
    fn environment_references(
        &self,
        environment: Environment,
    ) -> Result<(WorldReferences, usize)> {
        let mut references = WorldReferences::default();
        let mut records = 0;
        for metadata in self.world_store.list_worlds(environment)? {
            if let Some(world) = self.world_store.find_world(environment, &metadata.id)? {
                records += world.record_count();
                references.extend(WorldReferences::of(&world));
            }
        }
        Ok((references, records))
    }

    /// Stored blobs that no record references and no existing artifact or
    /// conversation owns.
    pub fn find_orphaned_blobs(&self, environment: Environment) -> Result<BTreeSet<String>> {
        let (references, _) = self.environment_references(environment)?;
        Ok(self
            .blob_store
            .list_blobs(environment)?
            .into_iter()
            .filter(|blob| !references.claims(blob))
            .map(|blob| blob.id)
            .collect())
    }

    /// Deletes orphaned blobs, or only lists them with `dry_run`.
    pub fn delete_orphaned_blobs(
        &self,
        environment: Environment,
        dry_run: bool,
    ) -> Result<Vec<String>> {
        let orphans: Vec<String> = self.find_orphaned_blobs(environment)?.into_iter().collect();
        if !dry_run {
            for blob_id in &orphans {
                self.blob_store.delete_blob(environment, blob_id)?;
            }
        }
        tracing::info!(
            environment = %environment,
            count = orphans.len(),
            dry_run,
            "Orphaned blobs"
        );
        Ok(orphans)
    }

    /// Auto-cleanup worlds whose retention window has elapsed at `now`.
    pub fn find_expired_worlds(
        &self,
        environment: Environment,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        Ok(self
            .world_store
            .list_worlds(environment)?
            .into_iter()
            .filter(|metadata| metadata.is_expired(now))
            .map(|metadata| metadata.id)
            .collect())
    }

    /// Deletes expired worlds, or only lists them with `dry_run`.
    pub fn cleanup_expired_worlds(
        &self,
        environment: Environment,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Vec<String>> {
        let expired = self.find_expired_worlds(environment, now)?;
        if !dry_run {
            for world_id in &expired {
                self.world_store.delete_world(environment, world_id)?;
            }
        }
        tracing::info!(
            environment = %environment,
            count = expired.len(),
            dry_run,
            "Expired worlds"
        );
        Ok(expired)
    }

    pub fn health_report(
        &self,
        environment: Environment,
        now: DateTime<Utc>,
    ) -> Result<HealthReport> {
        let worlds = self.world_store.list_worlds(environment)?;
        let (references, records) = self.environment_references(environment)?;
        let blobs = self.blob_store.list_blobs(environment)?;

        Ok(HealthReport {
            environment,
            generated_at: now,
            worlds: worlds.len(),
            active_worlds: worlds.iter().filter(|m| m.is_active).count(),
            templates: worlds.iter().filter(|m| m.is_template).count(),
            records,
            blobs: blobs.len(),
            blob_bytes: blobs.iter().map(|b| b.size).sum(),
            orphaned_blobs: blobs
                .iter()
                .filter(|blob| !references.claims(blob))
                .map(|blob| blob.id.clone())
                .collect(),
            expired_worlds: worlds
                .iter()
                .filter(|m| m.is_expired(now))
                .map(|m| m.id.clone())
                .collect(),
            invalid_packages: SeedCodec::list_invalid(&self.seeds_dir)?,
        })
    }
}

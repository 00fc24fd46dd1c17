//! Environment-wide operations: backup, restore, transfer and sync.

use crate::attachments::{WorldReferences, copy_blob};
use chrono::Utc;
use phoenix_core::blob::BlobStore;
use phoenix_core::seed::BackupFile;
use phoenix_core::world::{World, WorldChangeSet, WorldStore};
use phoenix_core::{Environment, PhoenixError, Result};
use phoenix_infrastructure::BackupStorage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub source_environment: Environment,
    pub target_environment: Environment,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Worlds that already existed and were left alone (no overwrite).
    pub skipped: Vec<String>,
    /// Records whose world is not part of the backup.
    pub unmatched_records: usize,
}

/// Options for [`EnvironmentUseCase::transfer_data`].
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub source: Environment,
    pub target: Environment,
    /// Worlds to transfer; empty means every world of the source.
    pub world_ids: Vec<String>,
    pub overwrite: bool,
    pub include_attachments: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    pub transferred: Vec<String>,
    pub skipped: Vec<String>,
    pub blobs_copied: usize,
    pub blobs_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    pub blobs_copied: usize,
}

/// Backup, restore and cross-environment copying of whole worlds.
pub struct EnvironmentUseCase {
    world_store: Arc<dyn WorldStore>,
    blob_store: Arc<dyn BlobStore>,
    backups: BackupStorage,
}

impl EnvironmentUseCase {
    pub fn new(
        world_store: Arc<dyn WorldStore>,
        blob_store: Arc<dyn BlobStore>,
        backups: BackupStorage,
    ) -> Self {
        Self {
            world_store,
            blob_store,
            backups,
        }
    }

    fn load_all(&self, environment: Environment) -> Result<Vec<World>> {
        let mut worlds = Vec::new();
        for metadata in self.world_store.list_worlds(environment)? {
            if let Some(world) = self.world_store.find_world(environment, &metadata.id)? {
                worlds.push(world);
            }
        }
        Ok(worlds)
    }

    /// Writes a point-in-time backup of every world in an environment.
    pub fn backup_environment(&self, environment: Environment) -> Result<PathBuf> {
        let worlds = self.load_all(environment)?;
        let backup = BackupFile::from_worlds(environment, Utc::now(), worlds)?;
        let path = self.backups.save(&backup)?;
        tracing::info!(
            environment = %environment,
            worlds = backup.worlds.len(),
            records = backup.metadata.total_records,
            path = %path.display(),
            "Backed up environment"
        );
        Ok(path)
    }

    /// Backup files in the backups directory, oldest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>> {
        self.backups.list()
    }

    /// Restores a backup into `target`.
    ///
    /// The file's shape and every world in it are checked before the store
    /// is touched. Existing worlds are replaced only with `overwrite`.
    pub fn restore_backup(
        &self,
        file: &Path,
        target: Environment,
        overwrite: bool,
    ) -> Result<RestoreReport> {
        let backup = BackupStorage::load(file)?;
        let source = backup.environment;
        let (worlds, unmatched_records) = backup.into_worlds();
        for world in &worlds {
            world.metadata.validate()?;
            world.validate_records()?;
        }
        if unmatched_records > 0 {
            tracing::warn!(
                file = %file.display(),
                unmatched_records,
                "Backup holds records of worlds it does not contain"
            );
        }

        let mut report = RestoreReport {
            source_environment: source,
            target_environment: target,
            created: Vec::new(),
            updated: Vec::new(),
            skipped: Vec::new(),
            unmatched_records,
        };
        for mut world in worlds {
            let world_id = world.id().to_string();
            let exists = self.world_store.exists(target, &world_id)?;
            if exists && !overwrite {
                report.skipped.push(world_id);
                continue;
            }
            world.metadata.environment = target;
            self.world_store.commit(target, WorldChangeSet::full(world))?;
            if exists {
                report.updated.push(world_id);
            } else {
                report.created.push(world_id);
            }
        }

        tracing::info!(
            file = %file.display(),
            target = %target,
            created = report.created.len(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            "Restored backup"
        );
        Ok(report)
    }

    /// Copies worlds (and optionally their attachments) between environments.
    ///
    /// Every explicitly named world must exist in the source; this is
    /// checked before anything is written.
    pub fn transfer_data(&self, options: TransferOptions) -> Result<TransferReport> {
        let TransferOptions {
            source,
            target,
            world_ids,
            overwrite,
            include_attachments,
        } = options;
        ensure_distinct(source, target)?;

        let worlds = if world_ids.is_empty() {
            self.load_all(source)?
        } else {
            let mut worlds = Vec::with_capacity(world_ids.len());
            for world_id in &world_ids {
                let world = self
                    .world_store
                    .find_world(source, world_id)?
                    .ok_or_else(|| PhoenixError::not_found("world", world_id.clone()))?;
                worlds.push(world);
            }
            worlds
        };

        let mut report = TransferReport::default();
        let mut references = WorldReferences::default();
        for mut world in worlds {
            let world_id = world.id().to_string();
            if !overwrite && self.world_store.exists(target, &world_id)? {
                report.skipped.push(world_id);
                continue;
            }
            references.extend(WorldReferences::of(&world));
            world.metadata.environment = target;
            self.world_store.commit(target, WorldChangeSet::full(world))?;
            report.transferred.push(world_id);
        }

        if include_attachments {
            for blob in self.blob_store.list_blobs(source)? {
                if !references.claims(&blob) {
                    continue;
                }
                if !overwrite && self.blob_store.exists(target, &blob.id)? {
                    report.blobs_skipped += 1;
                    continue;
                }
                copy_blob(self.blob_store.as_ref(), &blob, source, target)?;
                report.blobs_copied += 1;
            }
        }

        tracing::info!(
            source = %source,
            target = %target,
            transferred = report.transferred.len(),
            skipped = report.skipped.len(),
            blobs = report.blobs_copied,
            "Transferred worlds"
        );
        Ok(report)
    }

    /// Upserts every world of `source` into `target` and copies attachments
    /// the target lacks.
    pub fn sync_environments(
        &self,
        source: Environment,
        target: Environment,
    ) -> Result<SyncReport> {
        ensure_distinct(source, target)?;

        let mut report = SyncReport::default();
        for mut world in self.load_all(source)? {
            let world_id = world.id().to_string();
            let exists = self.world_store.exists(target, &world_id)?;
            world.metadata.environment = target;
            self.world_store.commit(target, WorldChangeSet::full(world))?;
            if exists {
                report.updated.push(world_id);
            } else {
                report.inserted.push(world_id);
            }
        }

        for blob in self.blob_store.list_blobs(source)? {
            if self.blob_store.exists(target, &blob.id)? {
                continue;
            }
            copy_blob(self.blob_store.as_ref(), &blob, source, target)?;
            report.blobs_copied += 1;
        }

        tracing::info!(
            source = %source,
            target = %target,
            inserted = report.inserted.len(),
            updated = report.updated.len(),
            blobs = report.blobs_copied,
            "Synchronized environments"
        );
        Ok(report)
    }
}

fn ensure_distinct(source: Environment, target: Environment) -> Result<()> {
    if source == target {
        return Err(PhoenixError::validation(format!(
            "source and target environment are both {}",
            source
        )));
    }
    Ok(())
}

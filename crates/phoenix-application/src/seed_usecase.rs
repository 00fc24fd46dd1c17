//! Seed export and import.
//!
//! `SeedUseCase` sequences the whole import of a package into one
//! destination environment:
//!
//! ```text
//! Analyze -> ApplyWorld -> ApplyChildren -> TransferAttachments -> Done
//! ```
//!
//! `skip` at the world level short-circuits to `Done` when the world
//! already exists. World metadata and all three collections are merged in
//! memory and committed as one change set; attachments follow the commit.

use crate::attachments::{WorldReferences, free_blob_id, may_overwrite};
use crate::conflict_analyzer::ConflictAnalyzer;
use chrono::Utc;
use phoenix_core::blob::{BlobReference, BlobStore};
use phoenix_core::merge::{MergeStats, merge_collection_with_stats, merge_world};
use phoenix_core::seed::{
    ConflictAnalysis, ConflictStrategy, MergeStrategy, SeedManifest, WorldStrategy,
};
use phoenix_core::world::{
    CollectionKind, ID_FIELD, IsolationLevel, World, WorldChangeSet, WorldStore,
};
use phoenix_core::{Environment, PhoenixError, Result};
use phoenix_infrastructure::{PackageAttachment, SeedCodec, sanitize_database_url};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum::Display;

/// Steps of an import, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImportPhase {
    Analyze,
    ApplyWorld,
    ApplyChildren,
    TransferAttachments,
    Done,
}

/// Options for [`SeedUseCase::export_seed`].
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Environment to export from; defaults to the use case's environment.
    pub environment: Option<Environment>,
    pub include_attachments: bool,
    /// Package directory name; defaults to `<worldId>_<ENV>_<YYYYMMDD_HHMMSS>`.
    pub destination_name: Option<String>,
}

/// Outcome of attachment transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobTransferStats {
    pub uploaded: usize,
    pub replaced: usize,
    pub skipped: usize,
    /// Existing blobs left alone because the world's isolation level forbids touching them.
    pub isolated: usize,
    /// Incoming blob id -> id it was stored under.
    pub renamed: BTreeMap<String, String>,
    /// Listed attachments whose file is absent from the package.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub world_id: String,
    pub environment: Environment,
    pub package: PathBuf,
    /// Phase the import finished in.
    pub phase: ImportPhase,
    pub world_created: bool,
    /// The world existed and the world strategy was `skip`.
    pub world_skipped: bool,
    pub collections: BTreeMap<CollectionKind, MergeStats>,
    pub blobs: BlobTransferStats,
    pub analysis: ConflictAnalysis,
}

/// Export/import of seed packages against one destination environment.
pub struct SeedUseCase {
    world_store: Arc<dyn WorldStore>,
    blob_store: Arc<dyn BlobStore>,
    /// Destination of imports and default source of exports.
    environment: Environment,
    seeds_dir: PathBuf,
    database_urls: HashMap<Environment, String>,
}

impl SeedUseCase {
    /// Creates a new `SeedUseCase`.
    ///
    /// # Arguments
    ///
    /// * `world_store` - Store holding worlds of every environment
    /// * `blob_store` - Binary attachment storage
    /// * `environment` - Destination environment for imports
    /// * `seeds_dir` - Packages root used by export and listing
    pub fn new(
        world_store: Arc<dyn WorldStore>,
        blob_store: Arc<dyn BlobStore>,
        environment: Environment,
        seeds_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            world_store,
            blob_store,
            environment,
            seeds_dir: seeds_dir.into(),
            database_urls: HashMap::new(),
        }
    }

    /// Records the database URL of an environment; only its host part is
    /// ever written into a manifest.
    pub fn with_database_url(mut self, environment: Environment, url: impl Into<String>) -> Self {
        self.database_urls.insert(environment, url.into());
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Exports a world into a new package and returns its root path.
    ///
    /// With attachments, every stored blob owned by one of the world's
    /// artifacts or conversations, or referenced from any of its records,
    /// is copied into the package. Blobs that cannot be downloaded are
    /// skipped with a warning.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Root of the written package
    /// - `Err(PhoenixError::NotFound)`: The world does not exist
    pub fn export_seed(&self, world_id: &str, options: ExportOptions) -> Result<PathBuf> {
        let environment = options.environment.unwrap_or(self.environment);
        let world = self
            .world_store
            .find_world(environment, world_id)?
            .ok_or_else(|| PhoenixError::not_found("world", world_id))?;

        let attachments = if options.include_attachments {
            self.collect_attachments(environment, &world)?
        } else {
            Vec::new()
        };
        let references = attachments.iter().map(|a| a.reference.clone()).collect();

        let created_at = Utc::now();
        let database_url = self
            .database_urls
            .get(&environment)
            .and_then(|url| sanitize_database_url(url));
        let manifest = SeedManifest::new(world, references, database_url, created_at);

        let name = options.destination_name.unwrap_or_else(|| {
            format!(
                "{}_{}_{}",
                world_id,
                environment,
                created_at.format("%Y%m%d_%H%M%S")
            )
        });

        SeedCodec::write_package(
            &self.seeds_dir,
            &name,
            &manifest,
            options
                .include_attachments
                .then_some(attachments.as_slice()),
        )
    }

    fn collect_attachments(
        &self,
        environment: Environment,
        world: &World,
    ) -> Result<Vec<PackageAttachment>> {
        let references = WorldReferences::of(world);
        let mut attachments = Vec::new();
        for blob in self.blob_store.list_blobs(environment)? {
            if !references.claims(&blob) {
                continue;
            }
            match self.blob_store.download_blob(environment, &blob.id) {
                Ok(bytes) => {
                    let reference = BlobReference {
                        path: BlobReference::package_path(&blob.id, &blob.path),
                        size: bytes.len() as u64,
                        ..blob
                    };
                    attachments.push(PackageAttachment { reference, bytes });
                }
                Err(e) => {
                    tracing::warn!(
                        blob_id = %blob.id,
                        world_id = %world.id(),
                        error = %e,
                        "Skipping attachment that could not be downloaded"
                    );
                }
            }
        }
        Ok(attachments)
    }

    /// Compares a package against the destination environment.
    pub fn analyze_conflicts(&self, package: &Path) -> Result<ConflictAnalysis> {
        ConflictAnalyzer::new(self.world_store.clone(), self.environment).analyze(package)
    }

    /// Imports a package using the operator's strategies.
    ///
    /// Merges are not rolled back if attachment transfer fails afterwards;
    /// re-running the import converges since every step is keyed by id.
    pub fn import_seed(&self, package: &Path, strategy: &ConflictStrategy) -> Result<ImportReport> {
        let mut phase = ImportPhase::Analyze;
        tracing::info!(package = %package.display(), phase = %phase, "Importing seed package");

        let analysis = self.analyze_conflicts(package)?;
        let manifest = SeedCodec::read_manifest(package)?;
        let incoming = manifest.to_world();
        incoming.metadata.validate()?;
        incoming.validate_records()?;

        let mut report = ImportReport {
            world_id: incoming.id().to_string(),
            environment: self.environment,
            package: package.to_path_buf(),
            phase,
            world_created: false,
            world_skipped: false,
            collections: BTreeMap::new(),
            blobs: BlobTransferStats::default(),
            analysis,
        };

        let existing = self.world_store.find_world(self.environment, incoming.id())?;
        if existing.is_some() && strategy.world == WorldStrategy::Skip {
            report.world_skipped = true;
            report.phase = ImportPhase::Done;
            tracing::info!(world_id = %report.world_id, "World exists and strategy is skip");
            return Ok(report);
        }

        phase = ImportPhase::ApplyWorld;
        tracing::debug!(world_id = %report.world_id, phase = %phase, "Applying world");
        let mut metadata = match &existing {
            Some(current) => merge_world(&current.metadata, &incoming.metadata, strategy.world),
            None => incoming.metadata.clone(),
        };
        metadata.environment = self.environment;
        report.world_created = existing.is_none();

        phase = ImportPhase::ApplyChildren;
        tracing::debug!(world_id = %report.world_id, phase = %phase, "Applying children");
        let mut merged = World::new(metadata);
        for kind in CollectionKind::ALL {
            let current = existing
                .as_ref()
                .map(|world| world.collection(kind))
                .unwrap_or_default();
            let (records, stats) = merge_collection_with_stats(
                current,
                incoming.collection(kind),
                strategy.for_collection(kind),
                ID_FIELD,
            );
            tracing::debug!(
                world_id = %report.world_id,
                collection = %kind,
                added = stats.added,
                collisions = stats.collisions(),
                "Merged collection"
            );
            *merged.collection_mut(kind) = records;
            report.collections.insert(kind, stats);
        }
        let references = WorldReferences::of(&merged);
        let isolation = merged.metadata.isolation_level;
        self.world_store
            .commit(self.environment, WorldChangeSet::full(merged))?;

        phase = ImportPhase::TransferAttachments;
        tracing::debug!(world_id = %report.world_id, phase = %phase, "Transferring attachments");
        report.blobs = self.transfer_attachments(
            package,
            &manifest,
            strategy.blobs,
            isolation,
            &references,
        )?;

        report.phase = ImportPhase::Done;
        tracing::info!(
            world_id = %report.world_id,
            environment = %self.environment,
            created = report.world_created,
            uploaded = report.blobs.uploaded,
            "Imported seed package"
        );
        Ok(report)
    }

    fn transfer_attachments(
        &self,
        package: &Path,
        manifest: &SeedManifest,
        strategy: MergeStrategy,
        isolation: IsolationLevel,
        references: &WorldReferences,
    ) -> Result<BlobTransferStats> {
        let mut stats = BlobTransferStats::default();
        let store = self.blob_store.as_ref();

        for blob in &manifest.world.blobs {
            if !SeedCodec::blob_present(package, blob) {
                tracing::warn!(blob_id = %blob.id, "Attachment file missing from package");
                stats.missing.push(blob.id.clone());
                continue;
            }

            let Some(current) = store.find_blob(self.environment, &blob.id)? else {
                let bytes = SeedCodec::read_blob(package, blob)?;
                store.upload_blob(self.environment, blob, &bytes)?;
                stats.uploaded += 1;
                continue;
            };

            match strategy {
                MergeStrategy::Skip | MergeStrategy::Merge => stats.skipped += 1,
                MergeStrategy::Replace | MergeStrategy::Overwrite => {
                    if may_overwrite(isolation, &current, &references.owners) {
                        let bytes = SeedCodec::read_blob(package, blob)?;
                        store.upload_blob(self.environment, blob, &bytes)?;
                        stats.replaced += 1;
                    } else {
                        tracing::warn!(
                            blob_id = %blob.id,
                            isolation = %isolation,
                            "Existing attachment belongs elsewhere, not overwriting"
                        );
                        stats.isolated += 1;
                    }
                }
                MergeStrategy::Rename => {
                    let new_id = free_blob_id(store, self.environment, &blob.id)?;
                    let bytes = SeedCodec::read_blob(package, blob)?;
                    store.upload_blob(self.environment, &blob.with_id(new_id.clone()), &bytes)?;
                    stats.renamed.insert(blob.id.clone(), new_id);
                }
            }
        }
        Ok(stats)
    }

    pub fn validate_seed(&self, package: &Path) -> bool {
        SeedCodec::validate(package)
    }

    /// Names of the valid packages under the packages root.
    pub fn list_seeds(&self) -> Result<Vec<String>> {
        SeedCodec::list(&self.seeds_dir)
    }
}

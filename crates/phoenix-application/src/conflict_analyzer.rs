//! Conflict analysis of a seed package against live state.

use phoenix_core::blob::scanner;
use phoenix_core::merge::collision_set;
use phoenix_core::seed::{CollisionSets, ConflictAnalysis};
use phoenix_core::world::{CollectionKind, ID_FIELD, WorldStore};
use phoenix_core::{Environment, Result};
use phoenix_infrastructure::SeedCodec;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Compares a package's identifiers with those stored in one environment.
///
/// Read-only: never mutates the store.
pub struct ConflictAnalyzer {
    world_store: Arc<dyn WorldStore>,
    environment: Environment,
}

impl ConflictAnalyzer {
    pub fn new(world_store: Arc<dyn WorldStore>, environment: Environment) -> Self {
        Self {
            world_store,
            environment,
        }
    }

    /// Analyzes a package.
    ///
    /// # Returns
    ///
    /// - `Ok(ConflictAnalysis)`: Collision sets are empty when the world
    ///   does not exist in the destination
    /// - `Err(PhoenixError::Structural)`: The manifest is missing or invalid
    /// - `Err(_)`: Store failure while reading the destination
    pub fn analyze(&self, package: &Path) -> Result<ConflictAnalysis> {
        let manifest = SeedCodec::read_manifest(package)?;
        let world_id = manifest.world_id().to_string();

        let world_exists = self.world_store.exists(self.environment, &world_id)?;
        let mut conflicts = CollisionSets::default();
        if world_exists {
            for kind in CollectionKind::ALL {
                let existing = self
                    .world_store
                    .load_collection(self.environment, &world_id, kind)?;
                conflicts.set(
                    kind,
                    collision_set(&existing, manifest.collection(kind), ID_FIELD),
                );
            }
        }

        let missing_blobs: BTreeSet<String> = manifest
            .world
            .blobs
            .iter()
            .filter(|blob| !SeedCodec::blob_present(package, blob))
            .map(|blob| blob.id.clone())
            .collect();

        let incoming = manifest.to_world();
        let owners = incoming.attachment_owner_ids();
        let referenced = scanner::scan_records(incoming.records());
        let mut orphaned_blobs: BTreeSet<String> = manifest
            .world
            .blobs
            .iter()
            .filter(|blob| {
                let owned = blob
                    .owner_id
                    .as_ref()
                    .is_some_and(|owner| owners.contains(owner));
                !owned && !referenced.contains(&blob.id)
            })
            .map(|blob| blob.id.clone())
            .collect();
        orphaned_blobs.extend(SeedCodec::unlisted_blob_ids(package, &manifest)?);

        tracing::info!(
            world_id = %world_id,
            environment = %self.environment,
            world_exists,
            collisions = conflicts.total(),
            missing = missing_blobs.len(),
            orphaned = orphaned_blobs.len(),
            "Analyzed seed package"
        );

        Ok(ConflictAnalysis {
            world_id,
            environment: self.environment,
            package: package.to_path_buf(),
            world_exists,
            conflicts,
            orphaned_blobs,
            missing_blobs,
        })
    }
}

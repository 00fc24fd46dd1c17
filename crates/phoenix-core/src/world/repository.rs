//! World store trait.
//!
//! Defines the interface for world persistence operations within one or
//! more environments.

use super::model::{CollectionKind, Record, World, WorldMetadata};
use crate::environment::Environment;
use crate::error::Result;

/// A set of documents for one world written as a single unit of work.
///
/// `None` collections are left untouched by [`WorldStore::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorldChangeSet {
    pub metadata: WorldMetadata,
    pub users: Option<Vec<Record>>,
    pub artifacts: Option<Vec<Record>>,
    pub chats: Option<Vec<Record>>,
}

impl WorldChangeSet {
    /// A change set that rewrites the metadata only.
    pub fn metadata_only(metadata: WorldMetadata) -> Self {
        Self {
            metadata,
            users: None,
            artifacts: None,
            chats: None,
        }
    }

    /// A change set that rewrites the whole world.
    pub fn full(world: World) -> Self {
        Self {
            metadata: world.metadata,
            users: Some(world.users),
            artifacts: Some(world.artifacts),
            chats: Some(world.chats),
        }
    }

    pub fn world_id(&self) -> &str {
        &self.metadata.id
    }

    pub fn collection(&self, kind: CollectionKind) -> Option<&Vec<Record>> {
        match kind {
            CollectionKind::Users => self.users.as_ref(),
            CollectionKind::Artifacts => self.artifacts.as_ref(),
            CollectionKind::Chats => self.chats.as_ref(),
        }
    }
}

/// Repository for worlds and their child collections.
///
/// Every method is keyed by `(environment, world id)`; the same world id may
/// exist in two environments without conflict.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Write a [`WorldChangeSet`] as one unit of work, in the order
///   metadata → users → artifacts → chats
/// - Return `Ok(None)` / empty collections for absent worlds rather than errors
pub trait WorldStore: Send + Sync {
    /// Finds the metadata of a world.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(WorldMetadata))`: World found
    /// - `Ok(None)`: World not found
    /// - `Err(_)`: Error occurred during retrieval
    fn find_metadata(&self, environment: Environment, world_id: &str)
    -> Result<Option<WorldMetadata>>;

    /// Loads one child collection. Absent collections are empty.
    fn load_collection(
        &self,
        environment: Environment,
        world_id: &str,
        kind: CollectionKind,
    ) -> Result<Vec<Record>>;

    /// Lists the metadata of every world in an environment, sorted by id.
    fn list_worlds(&self, environment: Environment) -> Result<Vec<WorldMetadata>>;

    /// Writes a change set as a single unit of work.
    fn commit(&self, environment: Environment, changes: WorldChangeSet) -> Result<()>;

    /// Deletes a world and its collections (no-op if absent).
    fn delete_world(&self, environment: Environment, world_id: &str) -> Result<()>;

    /// Loads a world together with its three collections.
    fn find_world(&self, environment: Environment, world_id: &str) -> Result<Option<World>> {
        let Some(metadata) = self.find_metadata(environment, world_id)? else {
            return Ok(None);
        };
        let mut world = World::new(metadata);
        for kind in CollectionKind::ALL {
            *world.collection_mut(kind) = self.load_collection(environment, world_id, kind)?;
        }
        Ok(Some(world))
    }

    /// Checks if a world exists.
    fn exists(&self, environment: Environment, world_id: &str) -> Result<bool> {
        Ok(self.find_metadata(environment, world_id)?.is_some())
    }
}

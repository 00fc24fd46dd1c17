use crate::environment::Environment;
use crate::world::CollectionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Colliding identifiers per child collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionSets {
    pub users: BTreeSet<String>,
    pub artifacts: BTreeSet<String>,
    pub chats: BTreeSet<String>,
}

impl CollisionSets {
    pub fn get(&self, kind: CollectionKind) -> &BTreeSet<String> {
        match kind {
            CollectionKind::Users => &self.users,
            CollectionKind::Artifacts => &self.artifacts,
            CollectionKind::Chats => &self.chats,
        }
    }

    pub fn set(&mut self, kind: CollectionKind, ids: BTreeSet<String>) {
        match kind {
            CollectionKind::Users => self.users = ids,
            CollectionKind::Artifacts => self.artifacts = ids,
            CollectionKind::Chats => self.chats = ids,
        }
    }

    pub fn total(&self) -> usize {
        self.users.len() + self.artifacts.len() + self.chats.len()
    }
}

/// Result of comparing a seed package against live state.
///
/// Computed fresh for every import attempt and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictAnalysis {
    pub world_id: String,
    /// Environment the package was compared against.
    pub environment: Environment,
    pub package: PathBuf,
    pub world_exists: bool,
    pub conflicts: CollisionSets,
    /// Package attachments no incoming entity references.
    pub orphaned_blobs: BTreeSet<String>,
    /// Manifest attachments whose file is absent from the package.
    pub missing_blobs: BTreeSet<String>,
}

impl ConflictAnalysis {
    pub fn has_collisions(&self) -> bool {
        self.conflicts.total() > 0
    }
}

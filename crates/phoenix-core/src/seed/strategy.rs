//! Operator-supplied conflict resolution choices.

use crate::world::CollectionKind;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Resolution applied to a colliding child record or attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MergeStrategy {
    /// Incoming record supersedes the existing one.
    Replace,
    /// Incoming fields are laid over the existing record.
    Merge,
    /// Existing record is kept, incoming discarded.
    Skip,
    /// Same as `Replace`.
    Overwrite,
    /// Incoming record is kept under a derived identifier.
    Rename,
}

impl MergeStrategy {
    /// Whether the incoming value fully supersedes the existing one.
    pub fn supersedes(&self) -> bool {
        matches!(self, MergeStrategy::Replace | MergeStrategy::Overwrite)
    }
}

/// Resolution applied to the world metadata itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WorldStrategy {
    Replace,
    Merge,
    /// Leaves an existing world and all of its children untouched.
    Skip,
}

impl From<WorldStrategy> for MergeStrategy {
    fn from(strategy: WorldStrategy) -> Self {
        match strategy {
            WorldStrategy::Replace => MergeStrategy::Replace,
            WorldStrategy::Merge => MergeStrategy::Merge,
            WorldStrategy::Skip => MergeStrategy::Skip,
        }
    }
}

/// One resolution per collection, supplied for every import.
///
/// There is intentionally no `Default`: every choice must come from the
/// operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictStrategy {
    pub world: WorldStrategy,
    pub users: MergeStrategy,
    pub artifacts: MergeStrategy,
    pub chats: MergeStrategy,
    pub blobs: MergeStrategy,
}

impl ConflictStrategy {
    /// The strategy for one child collection.
    pub fn for_collection(&self, kind: CollectionKind) -> MergeStrategy {
        match kind {
            CollectionKind::Users => self.users,
            CollectionKind::Artifacts => self.artifacts,
            CollectionKind::Chats => self.chats,
        }
    }
}

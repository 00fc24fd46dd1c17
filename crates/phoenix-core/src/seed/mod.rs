//! Seed packages, backups and the operator's conflict resolution choices.

pub mod backup;
pub mod conflict;
pub mod manifest;
pub mod strategy;

pub use backup::{BACKUP_FORMAT_VERSION, BackupFile, BackupMetadata, BackupRecord};
pub use conflict::{CollisionSets, ConflictAnalysis};
pub use manifest::{
    BLOB_DIR, MANIFEST_FILE, README_FILE, SEED_FORMAT_VERSION, SeedManifest, SeedSource, SeedWorld,
};
pub use strategy::{ConflictStrategy, MergeStrategy, WorldStrategy};

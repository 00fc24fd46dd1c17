//! Point-in-time backup of every world in one environment.

use crate::environment::Environment;
use crate::error::{PhoenixError, Result};
use crate::world::{CollectionKind, Record, World, WorldMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Format version written into new backup files.
pub const BACKUP_FORMAT_VERSION: &str = "1.0.0";

/// Sections that must be present and array-typed for a backup to be valid.
pub const REQUIRED_SECTIONS: [&str; 4] = ["worlds", "artifacts", "users", "chats"];

/// A child record tagged with the world it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub world_id: String,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub total_records: usize,
    /// Byte length of the serialized data sections.
    pub backup_size: u64,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    pub timestamp: DateTime<Utc>,
    pub environment: Environment,
    pub worlds: Vec<WorldMetadata>,
    pub artifacts: Vec<BackupRecord>,
    pub users: Vec<BackupRecord>,
    pub chats: Vec<BackupRecord>,
    pub metadata: BackupMetadata,
}

impl BackupFile {
    /// Builds a backup from fully loaded worlds.
    pub fn from_worlds(
        environment: Environment,
        timestamp: DateTime<Utc>,
        worlds: Vec<World>,
    ) -> Result<Self> {
        let mut backup = Self {
            timestamp,
            environment,
            worlds: Vec::with_capacity(worlds.len()),
            artifacts: Vec::new(),
            users: Vec::new(),
            chats: Vec::new(),
            metadata: BackupMetadata {
                total_records: 0,
                backup_size: 0,
                version: BACKUP_FORMAT_VERSION.to_string(),
            },
        };

        for world in worlds {
            let world_id = world.metadata.id.as_str();
            backup.users.extend(tag(world_id, world.users));
            backup.artifacts.extend(tag(world_id, world.artifacts));
            backup.chats.extend(tag(world_id, world.chats));
            backup.worlds.push(world.metadata);
        }

        backup.metadata.total_records =
            backup.worlds.len() + backup.users.len() + backup.artifacts.len() + backup.chats.len();
        backup.metadata.backup_size = (serde_json::to_vec(&backup.worlds)?.len()
            + serde_json::to_vec(&backup.users)?.len()
            + serde_json::to_vec(&backup.artifacts)?.len()
            + serde_json::to_vec(&backup.chats)?.len()) as u64;
        Ok(backup)
    }

    /// Parses a backup from raw JSON, checking its shape first.
    pub fn from_value(raw: Value, path: &Path) -> Result<Self> {
        check_shape(&raw, path)?;
        serde_json::from_value(raw)
            .map_err(|e| PhoenixError::structural(path, format!("malformed backup: {}", e)))
    }

    /// Regroups the sections into worlds.
    ///
    /// Returns the worlds in backup order and the number of records whose
    /// world is not part of the backup (those are dropped).
    pub fn into_worlds(self) -> (Vec<World>, usize) {
        let mut order = Vec::with_capacity(self.worlds.len());
        let mut by_id: BTreeMap<String, World> = BTreeMap::new();
        for metadata in self.worlds {
            order.push(metadata.id.clone());
            by_id.insert(metadata.id.clone(), World::new(metadata));
        }

        let mut unmatched = 0;
        let sections = [
            (CollectionKind::Users, self.users),
            (CollectionKind::Artifacts, self.artifacts),
            (CollectionKind::Chats, self.chats),
        ];
        for (kind, entries) in sections {
            for entry in entries {
                match by_id.get_mut(&entry.world_id) {
                    Some(world) => world.collection_mut(kind).push(entry.record),
                    None => unmatched += 1,
                }
            }
        }

        let worlds = order
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect();
        (worlds, unmatched)
    }
}

fn tag(world_id: &str, records: Vec<Record>) -> Vec<BackupRecord> {
    records
        .into_iter()
        .map(|record| BackupRecord {
            world_id: world_id.to_string(),
            record,
        })
        .collect()
}

/// Checks that the four data sections are present and array-typed.
pub fn check_shape(raw: &Value, path: &Path) -> Result<()> {
    let Some(object) = raw.as_object() else {
        return Err(PhoenixError::structural(path, "backup is not a JSON object"));
    };
    for section in REQUIRED_SECTIONS {
        match object.get(section) {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(PhoenixError::structural(
                    path,
                    format!("section '{}' is not an array", section),
                ));
            }
            None => {
                return Err(PhoenixError::structural(
                    path,
                    format!("section '{}' is missing", section),
                ));
            }
        }
    }
    Ok(())
}

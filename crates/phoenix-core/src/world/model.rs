use crate::environment::Environment;
use crate::error::{PhoenixError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use strum::{Display, EnumString};

/// Schema version stamped on newly created worlds.
pub const WORLD_SCHEMA_VERSION: &str = "1.0.0";

/// Field holding the identifier of every child record.
pub const ID_FIELD: &str = "id";

/// A child collection entry (user, artifact or conversation).
///
/// The engine never interprets record fields beyond the identifier.
pub type Record = Map<String, Value>;

/// Returns the identifier of a record as a string.
///
/// String and numeric identifiers are both accepted; anything else
/// (missing, null, object, empty string) yields `None`.
pub fn record_id(record: &Record, id_field: &str) -> Option<String> {
    match record.get(id_field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// How strongly a world's data must be kept apart from other worlds
/// when a merge touches shared data (attachments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IsolationLevel {
    Full,
    Partial,
    None,
}

impl Default for IsolationLevel {
    fn default() -> Self {
        IsolationLevel::Partial
    }
}

/// The three child collections of a world.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CollectionKind {
    Users,
    Artifacts,
    /// Conversations.
    Chats,
}

impl CollectionKind {
    /// Every collection, in the fixed order imports write them.
    pub const ALL: [CollectionKind; 3] = [
        CollectionKind::Users,
        CollectionKind::Artifacts,
        CollectionKind::Chats,
    ];

    /// File stem used by the directory store.
    pub fn file_name(&self) -> &'static str {
        match self {
            CollectionKind::Users => "users.json",
            CollectionKind::Artifacts => "artifacts.json",
            CollectionKind::Chats => "chats.json",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_world_version() -> String {
    WORLD_SCHEMA_VERSION.to_string()
}

/// Descriptive and lifecycle attributes of a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMetadata {
    /// Stable identifier, immutable once created.
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form settings object, shallow-merged on world merge.
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub category: String,
    pub environment: Environment,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub auto_cleanup: bool,
    /// Retention window used when `auto_cleanup` is set.
    #[serde(default)]
    pub cleanup_after_hours: Option<u32>,
    #[serde(default)]
    pub isolation_level: IsolationLevel,
    /// Monotonic usage counter.
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Schema version of the world's content.
    #[serde(default = "default_world_version")]
    pub version: String,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Other worlds this world builds on.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl WorldMetadata {
    /// Creates metadata with default lifecycle flags.
    pub fn new(id: impl Into<String>, name: impl Into<String>, environment: Environment) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            settings: Map::new(),
            tags: BTreeSet::new(),
            category: String::new(),
            environment,
            is_template: false,
            is_active: true,
            auto_cleanup: false,
            cleanup_after_hours: None,
            isolation_level: IsolationLevel::default(),
            usage_count: 0,
            last_used_at: None,
            version: default_world_version(),
            created_by: None,
            dependencies: BTreeSet::new(),
        }
    }

    /// Checks the minimal identifying fields an incoming world must carry.
    pub fn validate(&self) -> Result<()> {
        validate_world_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(PhoenixError::validation(format!(
                "world '{}' has an empty name",
                self.id
            )));
        }
        Ok(())
    }

    /// Whether the retention window of an auto-cleanup world has elapsed.
    ///
    /// Templates, worlds without a retention window and worlds that were
    /// never used do not expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if !self.auto_cleanup || self.is_template {
            return false;
        }
        match (self.cleanup_after_hours, self.last_used_at) {
            (Some(hours), Some(last_used)) => {
                now - last_used > chrono::Duration::hours(i64::from(hours))
            }
            _ => false,
        }
    }
}

/// Whether `id` can name a single store directory.
///
/// Only real traversal is rejected: `.`, `..`, separators and NUL. Dots
/// inside a name (`release..2`) are fine.
pub fn is_path_safe(id: &str) -> bool {
    !id.trim().is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

/// Rejects identifiers that cannot safely name a store directory.
pub fn validate_world_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(PhoenixError::validation("world id must not be empty"));
    }
    if !is_path_safe(id) {
        return Err(PhoenixError::validation(format!(
            "world id '{}' contains path characters",
            id
        )));
    }
    Ok(())
}

/// A world with its three child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub metadata: WorldMetadata,
    #[serde(default)]
    pub users: Vec<Record>,
    #[serde(default)]
    pub artifacts: Vec<Record>,
    #[serde(default)]
    pub chats: Vec<Record>,
}

impl World {
    /// Creates a world with empty collections.
    pub fn new(metadata: WorldMetadata) -> Self {
        Self {
            metadata,
            users: Vec::new(),
            artifacts: Vec::new(),
            chats: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn collection(&self, kind: CollectionKind) -> &[Record] {
        match kind {
            CollectionKind::Users => &self.users,
            CollectionKind::Artifacts => &self.artifacts,
            CollectionKind::Chats => &self.chats,
        }
    }

    pub fn collection_mut(&mut self, kind: CollectionKind) -> &mut Vec<Record> {
        match kind {
            CollectionKind::Users => &mut self.users,
            CollectionKind::Artifacts => &mut self.artifacts,
            CollectionKind::Chats => &mut self.chats,
        }
    }

    /// Identifiers of the entities that may own attachments
    /// (artifacts and conversations).
    pub fn attachment_owner_ids(&self) -> BTreeSet<String> {
        self.artifacts
            .iter()
            .chain(self.chats.iter())
            .filter_map(|r| record_id(r, ID_FIELD))
            .collect()
    }

    /// Every record of every collection.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.users
            .iter()
            .chain(self.artifacts.iter())
            .chain(self.chats.iter())
    }

    pub fn record_count(&self) -> usize {
        self.users.len() + self.artifacts.len() + self.chats.len()
    }

    /// Checks that every child record carries an identifier.
    pub fn validate_records(&self) -> Result<()> {
        for kind in CollectionKind::ALL {
            validate_records(self.id(), kind, self.collection(kind))?;
        }
        Ok(())
    }
}

/// Checks that every record of a collection has an identifier.
pub fn validate_records(world_id: &str, kind: CollectionKind, records: &[Record]) -> Result<()> {
    if let Some(position) = records
        .iter()
        .position(|r| record_id(r, ID_FIELD).is_none())
    {
        return Err(PhoenixError::validation(format!(
            "record #{} in {} of world '{}' has no '{}' field",
            position, kind, world_id, ID_FIELD
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_record_id_accepts_strings_and_numbers() {
        assert_eq!(record_id(&record(json!({"id": "u1"})), ID_FIELD), Some("u1".into()));
        assert_eq!(record_id(&record(json!({"id": 7})), ID_FIELD), Some("7".into()));
        assert_eq!(record_id(&record(json!({"id": ""})), ID_FIELD), None);
        assert_eq!(record_id(&record(json!({"name": "x"})), ID_FIELD), None);
    }

    #[test]
    fn test_metadata_deserializes_manifest_keys() {
        let metadata: WorldMetadata = serde_json::from_value(json!({
            "id": "w1",
            "name": "Demo",
            "environment": "BETA",
            "isTemplate": true,
            "cleanupAfterHours": 24,
            "isolationLevel": "full",
            "tags": ["b", "a", "a"]
        }))
        .unwrap();

        assert_eq!(metadata.environment, Environment::Beta);
        assert!(metadata.is_template);
        assert!(metadata.is_active);
        assert_eq!(metadata.cleanup_after_hours, Some(24));
        assert_eq!(metadata.isolation_level, IsolationLevel::Full);
        assert_eq!(metadata.tags.len(), 2);
        assert_eq!(metadata.version, WORLD_SCHEMA_VERSION);
    }

    #[test]
    fn test_validate_world_id() {
        assert!(validate_world_id("world-1").is_ok());
        assert!(validate_world_id("").is_err());
        assert!(validate_world_id("../etc").is_err());
        assert!(validate_world_id("a/b").is_err());
        assert!(validate_world_id("..").is_err());
        assert!(validate_world_id("a\0b").is_err());
        assert!(validate_world_id("release..2").is_ok());
        assert!(validate_world_id("v1.2").is_ok());
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let mut metadata = WorldMetadata::new("w1", "Demo", Environment::Local);
        metadata.auto_cleanup = true;
        metadata.cleanup_after_hours = Some(2);
        metadata.last_used_at = Some(now - chrono::Duration::hours(3));
        assert!(metadata.is_expired(now));

        metadata.last_used_at = Some(now - chrono::Duration::hours(1));
        assert!(!metadata.is_expired(now));

        metadata.last_used_at = Some(now - chrono::Duration::hours(3));
        metadata.is_template = true;
        assert!(!metadata.is_expired(now));
    }

    #[test]
    fn test_validate_records_reports_collection() {
        let mut world = World::new(WorldMetadata::new("w1", "Demo", Environment::Local));
        world.artifacts.push(record(json!({"title": "no id"})));
        let err = world.validate_records().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("artifacts"));
    }
}

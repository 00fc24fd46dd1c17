//! Merge engine.
//!
//! Reconciles an existing collection with an incoming one, record by
//! record, keyed by identifier. Every function here is pure: inputs are
//! borrowed, the reconciled collection is returned as a new value.

use crate::seed::{MergeStrategy, WorldStrategy};
use crate::world::{Record, WorldMetadata, record_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

/// What a merge did to each incoming record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub added: usize,
    pub replaced: usize,
    pub merged: usize,
    pub skipped: usize,
    pub renamed: usize,
}

impl MergeStats {
    pub fn collisions(&self) -> usize {
        self.replaced + self.merged + self.skipped + self.renamed
    }
}

/// Merges `incoming` into a copy of `existing`.
///
/// New identifiers are appended unchanged whatever the strategy. Colliding
/// identifiers are resolved by `strategy`:
///
/// - `Replace` / `Overwrite`: the incoming record takes the existing slot
/// - `Merge`: incoming fields are laid over the existing record
/// - `Skip`: the existing record is kept
/// - `Rename`: the incoming record is appended as `<id>_imported_<n>`
///
/// Records without an identifier cannot collide and are appended.
pub fn merge_collection(
    existing: &[Record],
    incoming: &[Record],
    strategy: MergeStrategy,
    id_field: &str,
) -> Vec<Record> {
    merge_collection_with_stats(existing, incoming, strategy, id_field).0
}

/// Same as [`merge_collection`], also counting what happened.
pub fn merge_collection_with_stats(
    existing: &[Record],
    incoming: &[Record],
    strategy: MergeStrategy,
    id_field: &str,
) -> (Vec<Record>, MergeStats) {
    let mut merged = existing.to_vec();
    let mut stats = MergeStats::default();

    let mut positions: HashMap<String, usize> = HashMap::new();
    for (position, record) in merged.iter().enumerate() {
        if let Some(id) = record_id(record, id_field) {
            positions.entry(id).or_insert(position);
        }
    }
    // Rename targets must avoid every id already present or still to come.
    let mut taken: HashSet<String> = positions.keys().cloned().collect();
    taken.extend(incoming.iter().filter_map(|r| record_id(r, id_field)));

    for record in incoming {
        let Some(id) = record_id(record, id_field) else {
            merged.push(record.clone());
            stats.added += 1;
            continue;
        };

        let Some(&position) = positions.get(&id) else {
            positions.insert(id, merged.len());
            merged.push(record.clone());
            stats.added += 1;
            continue;
        };

        match strategy {
            MergeStrategy::Replace | MergeStrategy::Overwrite => {
                merged[position] = record.clone();
                stats.replaced += 1;
            }
            MergeStrategy::Merge => {
                let target = &mut merged[position];
                for (key, value) in record {
                    target.insert(key.clone(), value.clone());
                }
                stats.merged += 1;
            }
            MergeStrategy::Skip => {
                stats.skipped += 1;
            }
            MergeStrategy::Rename => {
                let new_id = unique_id(&id, &taken);
                taken.insert(new_id.clone());
                let mut renamed = record.clone();
                renamed.insert(id_field.to_string(), Value::String(new_id.clone()));
                positions.insert(new_id, merged.len());
                merged.push(renamed);
                stats.renamed += 1;
            }
        }
    }

    (merged, stats)
}

/// First `<original>_imported_<n>` (n >= 1) not in `taken`.
pub fn unique_id(original: &str, taken: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{}_imported_{}", original, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{}_imported", original))
}

/// Identifiers present in both collections.
pub fn collision_set(existing: &[Record], incoming: &[Record], id_field: &str) -> BTreeSet<String> {
    let existing_ids = id_set(existing, id_field);
    incoming
        .iter()
        .filter_map(|r| record_id(r, id_field))
        .filter(|id| existing_ids.contains(id))
        .collect()
}

/// Identifiers of a collection.
pub fn id_set(records: &[Record], id_field: &str) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(|r| record_id(r, id_field))
        .collect()
}

/// Reconciles world metadata.
///
/// The identifier never changes and, unless skipped, the usage counter and
/// last-used timestamp never go backwards. `Merge` lets incoming scalars
/// win, keeps existing optional values the incoming side leaves unset,
/// unions tags and dependencies and shallow-merges settings.
pub fn merge_world(
    existing: &WorldMetadata,
    incoming: &WorldMetadata,
    strategy: WorldStrategy,
) -> WorldMetadata {
    let mut result = match strategy {
        WorldStrategy::Skip => return existing.clone(),
        WorldStrategy::Replace => incoming.clone(),
        WorldStrategy::Merge => {
            let mut merged = incoming.clone();
            merged.tags = existing.tags.union(&incoming.tags).cloned().collect();
            merged.dependencies = existing
                .dependencies
                .union(&incoming.dependencies)
                .cloned()
                .collect();
            let mut settings = existing.settings.clone();
            for (key, value) in &incoming.settings {
                settings.insert(key.clone(), value.clone());
            }
            merged.settings = settings;
            merged.cleanup_after_hours = incoming
                .cleanup_after_hours
                .or(existing.cleanup_after_hours);
            merged.created_by = incoming
                .created_by
                .clone()
                .or_else(|| existing.created_by.clone());
            merged
        }
    };

    result.id = existing.id.clone();
    result.usage_count = existing.usage_count.max(incoming.usage_count);
    result.last_used_at = existing.last_used_at.max(incoming.last_used_at);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::world::ID_FIELD;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_merge_shallow_merges_fields() {
        let existing = records(json!([{"id": "a", "title": "Old", "body": "kept"}]));
        let incoming = records(json!([{"id": "a", "title": "New"}]));

        let (merged, stats) =
            merge_collection_with_stats(&existing, &incoming, MergeStrategy::Merge, ID_FIELD);
        assert_eq!(merged, records(json!([{"id": "a", "title": "New", "body": "kept"}])));
        assert_eq!(stats.merged, 1);
    }

    #[test]
    fn test_rename_skips_taken_suffixes() {
        let existing = records(json!([{"id": "a"}, {"id": "a_imported_1"}]));
        let incoming = records(json!([{"id": "a", "v": 2}]));

        let merged = merge_collection(&existing, &incoming, MergeStrategy::Rename, ID_FIELD);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2]["id"], "a_imported_2");
        assert_eq!(merged[2]["v"], 2);
    }

    #[test]
    fn test_rename_avoids_later_incoming_ids() {
        let existing = records(json!([{"id": "a"}]));
        let incoming = records(json!([{"id": "a"}, {"id": "a_imported_1"}]));

        let merged = merge_collection(&existing, &incoming, MergeStrategy::Rename, ID_FIELD);
        let ids: Vec<_> = merged.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("a_imported_2"), json!("a_imported_1")]);
    }

    #[test]
    fn test_incoming_duplicates_collide_with_each_other() {
        let incoming = records(json!([{"id": "a", "n": 1}, {"id": "a", "n": 2}]));
        let merged = merge_collection(&[], &incoming, MergeStrategy::Skip, ID_FIELD);
        assert_eq!(merged, records(json!([{"id": "a", "n": 1}])));
    }

    #[test]
    fn test_numeric_ids_collide_with_each_other() {
        let existing = records(json!([{"id": 7, "v": "old"}]));
        let incoming = records(json!([{"id": 7, "v": "new"}]));
        let merged = merge_collection(&existing, &incoming, MergeStrategy::Overwrite, ID_FIELD);
        assert_eq!(merged, incoming);
    }

    #[test]
    fn test_collision_set() {
        let existing = records(json!([{"id": "a"}, {"id": "b"}]));
        let incoming = records(json!([{"id": "b"}, {"id": "c"}]));
        assert_eq!(
            collision_set(&existing, &incoming, ID_FIELD),
            BTreeSet::from(["b".to_string()])
        );
    }

    #[test]
    fn test_merge_world_unions_sets_and_keeps_usage() {
        let now = Utc::now();
        let mut existing = WorldMetadata::new("w1", "Old", Environment::Prod);
        existing.tags.insert("demo".into());
        existing.settings.insert("theme".into(), json!("dark"));
        existing.settings.insert("lang".into(), json!("en"));
        existing.usage_count = 10;
        existing.last_used_at = Some(now);
        existing.created_by = Some("alice".into());

        let mut incoming = WorldMetadata::new("w1", "New", Environment::Local);
        incoming.tags.insert("qa".into());
        incoming.settings.insert("theme".into(), json!("light"));
        incoming.usage_count = 3;
        incoming.last_used_at = Some(now - Duration::days(1));

        let merged = merge_world(&existing, &incoming, WorldStrategy::Merge);
        assert_eq!(merged.name, "New");
        assert_eq!(merged.tags.len(), 2);
        assert_eq!(merged.settings["theme"], "light");
        assert_eq!(merged.settings["lang"], "en");
        assert_eq!(merged.usage_count, 10);
        assert_eq!(merged.last_used_at, Some(now));
        assert_eq!(merged.created_by.as_deref(), Some("alice"));

        let replaced = merge_world(&existing, &incoming, WorldStrategy::Replace);
        assert_eq!(replaced.tags.len(), 1);
        assert_eq!(replaced.usage_count, 10);

        assert_eq!(merge_world(&existing, &incoming, WorldStrategy::Skip), existing);
    }
}

use phoenix_core::merge::{merge_collection, merge_collection_with_stats};
use phoenix_core::seed::MergeStrategy;
use phoenix_core::world::{ID_FIELD, Record};
use serde_json::{Value, json};
use std::collections::HashSet;

const ALL: [MergeStrategy; 5] = [
    MergeStrategy::Replace,
    MergeStrategy::Merge,
    MergeStrategy::Skip,
    MergeStrategy::Overwrite,
    MergeStrategy::Rename,
];

fn records(value: Value) -> Vec<Record> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
}

fn find<'a>(records: &'a [Record], id: &str) -> &'a Record {
    records.iter().find(|r| r[ID_FIELD] == id).unwrap()
}

fn existing() -> Vec<Record> {
    records(json!([
        {"id": "a1", "title": "Intro", "tags": ["x"]},
        {"id": "a2", "title": "Body"},
        {"id": "a3", "title": "Outro"}
    ]))
}

fn incoming() -> Vec<Record> {
    records(json!([
        {"id": "a2", "title": "Body v2", "draft": true},
        {"id": "a4", "title": "Appendix"}
    ]))
}

#[test]
fn test_empty_incoming_is_noop() {
    for strategy in ALL {
        assert_eq!(merge_collection(&existing(), &[], strategy, ID_FIELD), existing());
    }
}

#[test]
fn test_empty_existing_yields_incoming() {
    for strategy in ALL {
        assert_eq!(merge_collection(&[], &incoming(), strategy, ID_FIELD), incoming());
    }
}

#[test]
fn test_disjoint_ids_concatenate() {
    let disjoint = records(json!([{"id": "b1"}, {"id": "b2"}]));
    for strategy in ALL {
        let (merged, stats) =
            merge_collection_with_stats(&existing(), &disjoint, strategy, ID_FIELD);
        assert_eq!(merged.len(), existing().len() + disjoint.len());
        assert_eq!(stats.added, 2);
        assert_eq!(stats.collisions(), 0);
    }
}

#[test]
fn test_replace_and_overwrite_take_incoming() {
    for strategy in [MergeStrategy::Replace, MergeStrategy::Overwrite] {
        let merged = merge_collection(&existing(), &incoming(), strategy, ID_FIELD);
        assert_eq!(find(&merged, "a2"), find(&incoming(), "a2"));
        assert_eq!(merged.len(), 4);
    }
}

#[test]
fn test_skip_keeps_existing() {
    let merged = merge_collection(&existing(), &incoming(), MergeStrategy::Skip, ID_FIELD);
    assert_eq!(find(&merged, "a2"), find(&existing(), "a2"));
    assert_eq!(find(&merged, "a4"), find(&incoming(), "a4"));
}

#[test]
fn test_rename_keeps_both_with_unique_ids() {
    let merged = merge_collection(&existing(), &incoming(), MergeStrategy::Rename, ID_FIELD);
    assert_eq!(merged.len(), 5);
    assert_eq!(find(&merged, "a2"), find(&existing(), "a2"));
    assert_eq!(find(&merged, "a2_imported_1")["title"], "Body v2");

    let ids: HashSet<_> = merged.iter().map(|r| r[ID_FIELD].to_string()).collect();
    assert_eq!(ids.len(), merged.len());
}

#[test]
fn test_merge_preserves_existing_order() {
    let merged = merge_collection(&existing(), &incoming(), MergeStrategy::Merge, ID_FIELD);
    let ids: Vec<_> = merged.iter().map(|r| r[ID_FIELD].clone()).collect();
    assert_eq!(ids, vec![json!("a1"), json!("a2"), json!("a3"), json!("a4")]);
    assert_eq!(
        find(&merged, "a2"),
        &records(json!([{"id": "a2", "title": "Body v2", "draft": true}]))[0]
    );
}

#[test]
fn test_user_scenarios() {
    let existing = records(json!([{"id": "u1"}]));
    let incoming = records(json!([{"id": "u1", "name": "New"}, {"id": "u2"}]));

    assert_eq!(
        merge_collection(&existing, &incoming, MergeStrategy::Merge, ID_FIELD),
        records(json!([{"id": "u1", "name": "New"}, {"id": "u2"}]))
    );
    assert_eq!(
        merge_collection(&existing, &incoming, MergeStrategy::Skip, ID_FIELD),
        records(json!([{"id": "u1"}, {"id": "u2"}]))
    );
    assert_eq!(
        merge_collection(&existing, &incoming, MergeStrategy::Rename, ID_FIELD),
        records(json!([{"id": "u1"}, {"id": "u1_imported_1", "name": "New"}, {"id": "u2"}]))
    );
}

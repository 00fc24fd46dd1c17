//! Blob reference scanner.
//!
//! Extracts candidate attachment identifiers from free-form content (plain
//! text, HTML-ish markup, JSON). Matching is a heuristic and over-inclusive.
//!
//! Recognized patterns, applied in order to every piece of text:
//!
//! 1. URL-embedded ids: `/blob/<id>`, `/blobs/<id>`, `/files/<id>`,
//!    `/attachments/<id>`, optionally behind `/api`
//! 2. Structured fields: `blobId`, `fileId`, `attachmentId` (also snake case)
//!    followed by `:` or `=`
//! 3. Attributes: `data-blob-id`, `data-file-id`, `data-attachment-id`
//! 4. `blob:<id>` URIs
//!
//! JSON content is additionally walked: any string under a key containing
//! `blob` or `file` whose value is identifier-shaped is a candidate, and
//! strings holding serialized JSON are parsed and walked as well.

use crate::world::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

const ID_TOKEN: &str = r"[A-Za-z0-9][A-Za-z0-9_-]{7,}";

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"(?i)/(?:api/)?(?:blobs?|files|attachments)/({ID_TOKEN})"),
        format!(
            r#"(?i)["']?(?:blob_?id|file_?id|attachment_?id)["']?\s*[:=]\s*["']?({ID_TOKEN})"#
        ),
        format!(r#"(?i)data-(?:blob|file|attachment)-id\s*=\s*["']({ID_TOKEN})["']"#),
        format!(r"(?i)\bblob:({ID_TOKEN})"),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static IDENTIFIER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(&format!("^{ID_TOKEN}$")).ok());

/// Whether a string looks like an attachment identifier.
pub fn is_identifier(candidate: &str) -> bool {
    IDENTIFIER
        .as_ref()
        .is_some_and(|regex| regex.is_match(candidate))
}

/// Extracts candidate attachment identifiers from arbitrary content.
pub fn scan(content: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    scan_text(content, &mut found);
    if looks_like_json(content) {
        if let Ok(value) = serde_json::from_str::<Value>(content) {
            walk(&value, None, &mut found);
        }
    }
    found
}

/// Extracts candidate attachment identifiers from a JSON value.
pub fn scan_value(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    if let Ok(serialized) = serde_json::to_string(value) {
        scan_text(&serialized, &mut found);
    }
    walk(value, None, &mut found);
    found
}

/// Extracts candidate attachment identifiers from every record.
pub fn scan_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for record in records {
        let value = Value::Object(record.clone());
        found.extend(scan_value(&value));
    }
    found
}

fn looks_like_json(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

fn scan_text(text: &str, found: &mut BTreeSet<String>) {
    for pattern in PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(id) = captures.get(1) {
                found.insert(id.as_str().to_string());
            }
        }
    }
}

fn walk(value: &Value, key: Option<&str>, found: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            if key.is_some_and(is_blob_key) && is_identifier(s) {
                found.insert(s.clone());
            }
            scan_text(s, found);
            if looks_like_json(s) {
                if let Ok(nested) = serde_json::from_str::<Value>(s) {
                    walk(&nested, None, found);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, key, found);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                walk(v, Some(k), found);
            }
        }
        _ => {}
    }
}

fn is_blob_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.contains("blob") || lower.contains("file")
}

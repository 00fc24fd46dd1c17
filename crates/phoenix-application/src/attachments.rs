//! Attachment selection and copying shared by the use cases.

use phoenix_core::blob::{BlobReference, BlobStore, scanner};
use phoenix_core::world::{IsolationLevel, World};
use phoenix_core::{Environment, Result};
use std::collections::BTreeSet;

/// Ids that tie attachments to a world: its artifact and conversation ids
/// (possible owners) and every id the scanner finds in its records.
#[derive(Debug, Clone, Default)]
pub struct WorldReferences {
    pub owners: BTreeSet<String>,
    pub referenced: BTreeSet<String>,
}

impl WorldReferences {
    pub fn of(world: &World) -> Self {
        Self {
            owners: world.attachment_owner_ids(),
            referenced: scanner::scan_records(world.records()),
        }
    }

    pub fn extend(&mut self, other: WorldReferences) {
        self.owners.extend(other.owners);
        self.referenced.extend(other.referenced);
    }

    /// Whether the blob is owned by or referenced from the world.
    pub fn claims(&self, blob: &BlobReference) -> bool {
        self.referenced.contains(&blob.id)
            || blob
                .owner_id
                .as_ref()
                .is_some_and(|owner| self.owners.contains(owner))
    }
}

/// Whether an existing attachment may be overwritten by an import into a
/// world with the given isolation level.
///
/// `owners` are the artifact and conversation ids of the importing world.
pub fn may_overwrite(
    level: IsolationLevel,
    existing: &BlobReference,
    owners: &BTreeSet<String>,
) -> bool {
    let owned_here = existing
        .owner_id
        .as_ref()
        .map(|owner| owners.contains(owner));
    match level {
        IsolationLevel::None => true,
        IsolationLevel::Partial => owned_here.unwrap_or(true),
        IsolationLevel::Full => owned_here.unwrap_or(false),
    }
}

/// First `<id>_imported_<n>` not yet stored in the environment.
pub fn free_blob_id(store: &dyn BlobStore, environment: Environment, id: &str) -> Result<String> {
    let mut n = 1;
    loop {
        let candidate = format!("{}_imported_{}", id, n);
        if !store.exists(environment, &candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Copies one attachment between environments.
pub fn copy_blob(
    store: &dyn BlobStore,
    blob: &BlobReference,
    source: Environment,
    target: Environment,
) -> Result<()> {
    let bytes = store.download_blob(source, &blob.id)?;
    store.upload_blob(target, blob, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(owner: Option<&str>) -> BlobReference {
        BlobReference {
            id: "blob-0001".into(),
            filename: "f.txt".into(),
            content_type: String::new(),
            size: 0,
            path: "f.txt".into(),
            owner_id: owner.map(String::from),
        }
    }

    #[test]
    fn test_may_overwrite_by_isolation_level() {
        let owners = BTreeSet::from(["a1".to_string()]);
        let cases = [
            (IsolationLevel::None, Some("other"), true),
            (IsolationLevel::Partial, None, true),
            (IsolationLevel::Partial, Some("a1"), true),
            (IsolationLevel::Partial, Some("other"), false),
            (IsolationLevel::Full, None, false),
            (IsolationLevel::Full, Some("a1"), true),
            (IsolationLevel::Full, Some("other"), false),
        ];
        for (level, owner, expected) in cases {
            assert_eq!(
                may_overwrite(level, &blob(owner), &owners),
                expected,
                "{level} / {owner:?}"
            );
        }
    }

    #[test]
    fn test_claims_by_owner_or_reference() {
        let references = WorldReferences {
            owners: BTreeSet::from(["a1".to_string()]),
            referenced: BTreeSet::from(["blob-0001".to_string()]),
        };
        assert!(references.claims(&blob(None)));
        let mut other = blob(Some("a1"));
        other.id = "blob-0002".into();
        assert!(references.claims(&other));
        other.owner_id = Some("zz".into());
        assert!(!references.claims(&other));
    }
}

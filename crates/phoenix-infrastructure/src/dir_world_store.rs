//! Directory-based WorldStore implementation.
//!
//! Each world is a directory of four JSON documents:
//!
//! ```text
//! <root>/<ENV>/worlds/<world_id>/
//! ├── world.json
//! ├── users.json
//! ├── artifacts.json
//! └── chats.json
//! ```

use crate::paths::environment_dir;
use crate::storage::{AtomicJsonFile, FileLock, StagedFile};
use phoenix_core::world::{
    CollectionKind, Record, WorldChangeSet, WorldMetadata, WorldStore, validate_world_id,
};
use phoenix_core::{Environment, PhoenixError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const WORLD_FILE: &str = "world.json";

/// World store rooted at a data directory, one subtree per environment.
#[derive(Debug, Clone)]
pub struct DirWorldStore {
    root: PathBuf,
}

impl DirWorldStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn worlds_dir(&self, environment: Environment) -> PathBuf {
        environment_dir(&self.root, environment).join("worlds")
    }

    fn world_dir(&self, environment: Environment, world_id: &str) -> Result<PathBuf> {
        validate_world_id(world_id)?;
        Ok(self.worlds_dir(environment).join(world_id))
    }

    fn metadata_file(dir: &Path) -> AtomicJsonFile<WorldMetadata> {
        AtomicJsonFile::new(dir.join(WORLD_FILE))
    }

    fn collection_file(dir: &Path, kind: CollectionKind) -> AtomicJsonFile<Vec<Record>> {
        AtomicJsonFile::new(dir.join(kind.file_name()))
    }
}

fn context(what: impl std::fmt::Display, world_id: &str, environment: Environment) -> String {
    format!("{} of world '{}' in {}", what, world_id, environment)
}

impl WorldStore for DirWorldStore {
    fn find_metadata(
        &self,
        environment: Environment,
        world_id: &str,
    ) -> Result<Option<WorldMetadata>> {
        let dir = self.world_dir(environment, world_id)?;
        Self::metadata_file(&dir)
            .load()
            .map_err(|e| PhoenixError::store(context("metadata", world_id, environment), e))
    }

    fn load_collection(
        &self,
        environment: Environment,
        world_id: &str,
        kind: CollectionKind,
    ) -> Result<Vec<Record>> {
        let dir = self.world_dir(environment, world_id)?;
        let records = Self::collection_file(&dir, kind)
            .load()
            .map_err(|e| PhoenixError::store(context(kind, world_id, environment), e))?;
        Ok(records.unwrap_or_default())
    }

    fn list_worlds(&self, environment: Environment) -> Result<Vec<WorldMetadata>> {
        let dir = self.worlds_dir(environment);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| PhoenixError::store(format!("worlds of {}", environment), e))?;

        let mut worlds = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let world_id = entry.file_name().to_string_lossy().to_string();
            match Self::metadata_file(&entry.path()).load() {
                Ok(Some(metadata)) => worlds.push(metadata),
                Ok(None) => {
                    tracing::debug!(world_id = %world_id, "Skipping directory without world.json");
                }
                Err(e) => {
                    return Err(PhoenixError::store(
                        context("metadata", &world_id, environment),
                        e,
                    ));
                }
            }
        }
        worlds.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(worlds)
    }

    fn commit(&self, environment: Environment, changes: WorldChangeSet) -> Result<()> {
        let world_id = changes.world_id().to_string();
        let dir = self.world_dir(environment, &world_id)?;
        fs::create_dir_all(&dir)
            .map_err(|e| PhoenixError::store(context("directory", &world_id, environment), e))?;

        let _lock = FileLock::acquire(&dir.join(WORLD_FILE))
            .map_err(|e| PhoenixError::store(context("lock", &world_id, environment), e))?;

        // Stage everything first; nothing becomes visible unless every
        // document was written.
        let mut staged: Vec<StagedFile> = Vec::with_capacity(4);
        staged.push(
            Self::metadata_file(&dir)
                .stage(&changes.metadata)
                .map_err(|e| PhoenixError::store(context("metadata", &world_id, environment), e))?,
        );
        for kind in CollectionKind::ALL {
            if let Some(records) = changes.collection(kind) {
                staged.push(
                    Self::collection_file(&dir, kind)
                        .stage(records)
                        .map_err(|e| {
                            PhoenixError::store(context(kind, &world_id, environment), e)
                        })?,
                );
            }
        }

        let documents = staged.len();
        for file in staged {
            let target = file.target().display().to_string();
            file.commit()
                .map_err(|e| PhoenixError::store(format!("commit {}", target), e))?;
        }

        tracing::debug!(
            world_id = %world_id,
            environment = %environment,
            documents,
            "Committed world change set"
        );
        Ok(())
    }

    fn delete_world(&self, environment: Environment, world_id: &str) -> Result<()> {
        let dir = self.world_dir(environment, world_id)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| PhoenixError::store(context("directory", world_id, environment), e))?;
            tracing::info!(world_id = %world_id, environment = %environment, "Deleted world");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_core::world::World;
    use serde_json::json;
    use tempfile::TempDir;

    fn world(id: &str) -> World {
        let mut world = World::new(WorldMetadata::new(id, "Demo", Environment::Local));
        world.users.push(json!({"id": "u1"}).as_object().cloned().unwrap());
        world.chats.push(json!({"id": "c1", "title": "hello"}).as_object().cloned().unwrap());
        world
    }

    #[test]
    fn test_commit_and_find_world() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirWorldStore::new(temp_dir.path());

        store
            .commit(Environment::Local, WorldChangeSet::full(world("w1")))
            .unwrap();

        let loaded = store.find_world(Environment::Local, "w1").unwrap().unwrap();
        assert_eq!(loaded, world("w1"));
        assert!(temp_dir.path().join("LOCAL/worlds/w1/chats.json").exists());
        assert!(!store.exists(Environment::Beta, "w1").unwrap());
    }

    #[test]
    fn test_metadata_only_commit_keeps_collections() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirWorldStore::new(temp_dir.path());
        store
            .commit(Environment::Local, WorldChangeSet::full(world("w1")))
            .unwrap();

        let mut metadata = world("w1").metadata;
        metadata.name = "Renamed".into();
        store
            .commit(Environment::Local, WorldChangeSet::metadata_only(metadata))
            .unwrap();

        let loaded = store.find_world(Environment::Local, "w1").unwrap().unwrap();
        assert_eq!(loaded.metadata.name, "Renamed");
        assert_eq!(loaded.users.len(), 1);
    }

    #[test]
    fn test_list_worlds_sorted_and_skips_stray_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirWorldStore::new(temp_dir.path());
        for id in ["w2", "w1"] {
            store
                .commit(Environment::Beta, WorldChangeSet::full(world(id)))
                .unwrap();
        }
        fs::create_dir_all(temp_dir.path().join("BETA/worlds/stray")).unwrap();

        let ids: Vec<_> = store
            .list_worlds(Environment::Beta)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["w1", "w2"]);
        assert!(store.list_worlds(Environment::Prod).unwrap().is_empty());
    }

    #[test]
    fn test_delete_world() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirWorldStore::new(temp_dir.path());
        store
            .commit(Environment::Local, WorldChangeSet::full(world("w1")))
            .unwrap();

        store.delete_world(Environment::Local, "w1").unwrap();
        assert!(store.find_world(Environment::Local, "w1").unwrap().is_none());
        store.delete_world(Environment::Local, "w1").unwrap();
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirWorldStore::new(temp_dir.path());
        let err = store.find_metadata(Environment::Local, "../x").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_corrupt_collection_is_store_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirWorldStore::new(temp_dir.path());
        store
            .commit(Environment::Local, WorldChangeSet::full(world("w1")))
            .unwrap();
        fs::write(temp_dir.path().join("LOCAL/worlds/w1/users.json"), "[{").unwrap();

        let err = store
            .load_collection(Environment::Local, "w1", CollectionKind::Users)
            .unwrap_err();
        assert!(err.is_store());
        assert!(err.to_string().contains("users of world 'w1' in LOCAL"));
    }
}

#![allow(dead_code)]

use phoenix_application::{EnvironmentUseCase, HousekeepingService, SeedUseCase};
use phoenix_core::Environment;
use phoenix_core::blob::{BlobReference, BlobStore};
use phoenix_core::world::{Record, World, WorldChangeSet, WorldMetadata, WorldStore};
use phoenix_infrastructure::{BackupStorage, DirWorldStore, FileSystemBlobStore};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Fixture {
    pub temp_dir: TempDir,
    pub world_store: Arc<DirWorldStore>,
    pub blob_store: Arc<FileSystemBlobStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        Self {
            world_store: Arc::new(DirWorldStore::new(&data_dir)),
            blob_store: Arc::new(FileSystemBlobStore::new(&data_dir)),
            temp_dir,
        }
    }

    pub fn seeds_dir(&self) -> PathBuf {
        self.temp_dir.path().join("seeds")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.temp_dir.path().join("backups")
    }

    pub fn seeds(&self, environment: Environment) -> SeedUseCase {
        SeedUseCase::new(
            self.world_store.clone(),
            self.blob_store.clone(),
            environment,
            self.seeds_dir(),
        )
    }

    pub fn environments(&self) -> EnvironmentUseCase {
        EnvironmentUseCase::new(
            self.world_store.clone(),
            self.blob_store.clone(),
            BackupStorage::new(self.backups_dir()),
        )
    }

    pub fn housekeeping(&self) -> HousekeepingService {
        HousekeepingService::new(
            self.world_store.clone(),
            self.blob_store.clone(),
            self.seeds_dir(),
        )
    }

    pub fn put_world(&self, world: World) {
        let environment = world.metadata.environment;
        self.world_store
            .commit(environment, WorldChangeSet::full(world))
            .unwrap();
    }

    pub fn get_world(&self, environment: Environment, id: &str) -> Option<World> {
        self.world_store.find_world(environment, id).unwrap()
    }

    pub fn put_blob(&self, environment: Environment, id: &str, owner: Option<&str>, bytes: &[u8]) {
        self.blob_store
            .upload_blob(environment, &blob_ref(id, owner), bytes)
            .unwrap();
    }

    pub fn blob_bytes(&self, environment: Environment, id: &str) -> Vec<u8> {
        self.blob_store.download_blob(environment, id).unwrap()
    }
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

pub fn records(value: Value) -> Vec<Record> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
}

pub fn world(id: &str, environment: Environment) -> World {
    World::new(WorldMetadata::new(id, format!("World {}", id), environment))
}

pub fn blob_ref(id: &str, owner: Option<&str>) -> BlobReference {
    BlobReference {
        id: id.into(),
        filename: "file.txt".into(),
        content_type: String::new(),
        size: 0,
        path: BlobReference::package_path(id, "file.txt"),
        owner_id: owner.map(String::from),
    }
}

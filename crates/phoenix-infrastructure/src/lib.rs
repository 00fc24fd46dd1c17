//! File-system implementations of the Phoenix stores and package formats.

pub mod backup_storage;
pub mod config_service;
pub mod dir_world_store;
pub mod fs_blob_store;
pub mod paths;
pub mod seed_codec;
pub mod storage;

pub use backup_storage::BackupStorage;
pub use config_service::{ConfigService, sanitize_database_url};
pub use dir_world_store::DirWorldStore;
pub use fs_blob_store::FileSystemBlobStore;
pub use paths::{PhoenixPaths, StorePaths};
pub use seed_codec::{PackageAttachment, SeedCodec};

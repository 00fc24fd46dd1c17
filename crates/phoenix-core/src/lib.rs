//! Domain layer of the Phoenix world synchronization engine.
//!
//! Holds the world model, seed manifests and backups, conflict strategies,
//! the store traits implemented by the infrastructure layer, and the two
//! pure algorithms: the merge engine and the blob reference scanner.

pub mod blob;
pub mod config;
pub mod environment;
pub mod error;
pub mod merge;
pub mod seed;
pub mod world;

// Re-export common types
pub use environment::Environment;
pub use error::{PhoenixError, Result};

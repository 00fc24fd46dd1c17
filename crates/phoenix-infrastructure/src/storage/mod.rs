//! Low-level file storage helpers shared by the stores.

pub mod atomic_json;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile, FileLock, StagedFile};

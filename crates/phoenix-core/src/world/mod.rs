pub mod model;
pub mod repository;

pub use model::{
    CollectionKind, ID_FIELD, IsolationLevel, Record, World, WorldMetadata, is_path_safe,
    record_id, validate_records, validate_world_id,
};
pub use repository::{WorldChangeSet, WorldStore};

//! Binary attachments: references, the store boundary and the reference scanner.

pub mod model;
pub mod scanner;
pub mod store;

pub use model::BlobReference;
pub use store::BlobStore;

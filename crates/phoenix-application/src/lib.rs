//! Use cases of the Phoenix synchronization engine.

pub mod attachments;
pub mod conflict_analyzer;
pub mod environment_usecase;
pub mod housekeeping;
pub mod seed_usecase;

pub use conflict_analyzer::ConflictAnalyzer;
pub use environment_usecase::{
    EnvironmentUseCase, RestoreReport, SyncReport, TransferOptions, TransferReport,
};
pub use housekeeping::{HealthReport, HousekeepingService};
pub use seed_usecase::{BlobTransferStats, ExportOptions, ImportPhase, ImportReport, SeedUseCase};

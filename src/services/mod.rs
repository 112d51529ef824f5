//! Domain services spanning several entities.

mod archive;
mod crm;
mod gc;
mod generation;
mod schedule_sync;

pub use archive::{ArchiveCounts, ArchiveService};
pub use crm::{upsert_after_commit, CrmError, CrmGateway, NoOpCrm};
pub use gc::{GcOptions, GcRun, GcService, GC_BATCH_SIZE};
pub use generation::{
    GenerationSummary, HabitGenerationService, PeriodicGenerationService, PeriodicSummary,
};
pub use schedule_sync::{FeedEvent, ScheduleSyncService, SyncSummary};

use super::contract::*;
use super::error::{UseCaseError, UseCaseResult};
use crate::db::{GcLogEntryRepository, ReadView, Repositories, TrunkEntityRepository};
use crate::models::*;
use crate::services::{GcOptions, GcService};

pub const DEFAULT_TAIL_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct GcSweepArgs {
    pub archive_done: bool,
}

/// Archives orphans and stale generated entities, then records the run.
pub struct GcSweep;

impl UseCase for GcSweep {
    const NAME: &'static str = "gc";
    type Args = GcSweepArgs;
    type Output = GcLogEntry;
}

impl LoggedInBatchUseCase for GcSweep {
    fn execute(
        &self,
        env: &UseCaseEnv,
        ctx: &DomainContext,
        session: &Session,
        args: GcSweepArgs,
    ) -> UseCaseResult<GcLogEntry> {
        let ctx = DomainContext::new(EventSource::Gc, ctx.action_timestamp);
        let options = GcOptions {
            archive_done: args.archive_done,
        };
        Ok(GcService::new(env.storage.clone()).sweep(
            &ctx,
            session.workspace_ref_id(),
            options,
            &env.cancellation,
        )?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GcLogTailArgs {
    pub limit: u32,
}

impl Default for GcLogTailArgs {
    fn default() -> Self {
        Self {
            limit: DEFAULT_TAIL_LIMIT,
        }
    }
}

/// The most recent GC log entries, newest first.
pub struct GcLogTail;

impl UseCase for GcLogTail {
    const NAME: &'static str = "gc-log";
    type Args = GcLogTailArgs;
    type Output = Vec<GcLogEntry>;
}

impl LoggedInReadonlyUseCase for GcLogTail {
    fn execute(
        &self,
        view: &ReadView<'_>,
        session: &Session,
        args: GcLogTailArgs,
    ) -> UseCaseResult<Vec<GcLogEntry>> {
        if args.limit == 0 {
            return Err(UseCaseError::Validation("limit must be at least 1".into()));
        }
        let log = view
            .repository::<GcLog>()
            .load_by_parent(session.workspace_ref_id())?;
        Ok(view
            .repository::<GcLogEntry>()
            .find_last(log.ref_id(), args.limit)?)
    }
}

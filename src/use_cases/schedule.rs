use super::contract::*;
use super::error::UseCaseResult;
use crate::db::{BranchEntityRepository, Repositories, TrunkEntityRepository, UnitOfWork};
use crate::models::*;
use crate::services::{FeedEvent, ScheduleSyncService, SyncSummary};

#[derive(Debug, Clone)]
pub struct CreateScheduleStreamArgs {
    pub name: EntityName,
    /// Imports the stream from this feed; a user stream when absent.
    pub source_ical_url: Option<String>,
}

pub struct CreateScheduleStream;

impl UseCase for CreateScheduleStream {
    const NAME: &'static str = "schedule-stream-create";
    type Args = CreateScheduleStreamArgs;
    type Output = ScheduleStream;
}

impl LoggedInMutationUseCase for CreateScheduleStream {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateScheduleStreamArgs,
    ) -> UseCaseResult<ScheduleStream> {
        session.require(WorkspaceFeature::Schedule)?;
        let domain = uow
            .repository::<ScheduleDomain>()
            .load_by_parent(session.workspace_ref_id())?;
        let stream = match args.source_ical_url {
            Some(url) => {
                ScheduleStream::new_schedule_stream_from_ical(ctx, domain.live_link()?, args.name, url)?
            }
            None => ScheduleStream::new_schedule_stream_for_user(ctx, domain.live_link()?, args.name)?,
        };
        Ok(uow.repository::<ScheduleStream>().create(stream)?)
    }
}

#[derive(Debug, Clone)]
pub struct SyncScheduleStreamArgs {
    pub ref_id: EntityId,
    pub events: Vec<FeedEvent>,
}

/// Applies an already-fetched feed to an imported stream.
pub struct SyncScheduleStream;

impl UseCase for SyncScheduleStream {
    const NAME: &'static str = "schedule-stream-sync";
    type Args = SyncScheduleStreamArgs;
    type Output = SyncSummary;
}

impl LoggedInMutationUseCase for SyncScheduleStream {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: SyncScheduleStreamArgs,
    ) -> UseCaseResult<SyncSummary> {
        session.require(WorkspaceFeature::Schedule)?;
        let stream = uow
            .repository::<ScheduleStream>()
            .load_by_id(args.ref_id, false)?;
        let ctx = DomainContext::new(EventSource::Sync, ctx.action_timestamp);
        Ok(ScheduleSyncService::new(uow, ctx).sync(&stream, args.events)?)
    }
}

use std::collections::BTreeSet;

use super::contract::*;
use super::error::UseCaseResult;
use crate::db::{
    EntityFilter, LeafEntityRepository, ReadView, Repositories, TrunkEntityRepository, UnitOfWork,
};
use crate::models::*;
use crate::services::ArchiveService;

#[derive(Debug, Clone)]
pub struct CreateJournalArgs {
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
}

/// A user journal for the period instance containing `right_now`.
///
/// A second live journal for the same period instance fails with
/// [`UseCaseError::JournalExists`](super::UseCaseError::JournalExists).
pub struct CreateJournal;

impl UseCase for CreateJournal {
    const NAME: &'static str = "journal-create";
    type Args = CreateJournalArgs;
    type Output = Journal;
}

impl LoggedInMutationUseCase for CreateJournal {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateJournalArgs,
    ) -> UseCaseResult<Journal> {
        session.require(WorkspaceFeature::Journals)?;
        let collection = uow
            .repository::<JournalCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let journal = Journal::new_journal(
            ctx,
            collection.live_link()?,
            JournalSource::User,
            args.right_now,
            args.period,
        )?;
        Ok(uow.repository::<Journal>().create(journal)?)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateJournalArgs {
    pub ref_id: EntityId,
    pub name: Option<EntityName>,
    /// Moves the journal; both parts are needed together.
    pub time_config: Option<(ADate, RecurringTaskPeriod)>,
}

pub struct UpdateJournal;

impl UseCase for UpdateJournal {
    const NAME: &'static str = "journal-update";
    type Args = UpdateJournalArgs;
    type Output = Journal;
}

impl LoggedInMutationUseCase for UpdateJournal {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateJournalArgs,
    ) -> UseCaseResult<Journal> {
        session.require(WorkspaceFeature::Journals)?;
        let repository = uow.repository::<Journal>();
        let mut journal = repository.load_by_id(args.ref_id, false)?;
        if let Some((right_now, period)) = args.time_config {
            journal.change_time_config(ctx, right_now, period)?;
        }
        if let Some(name) = args.name {
            journal.update_name(ctx, name)?;
        }
        Ok(repository.save(journal)?)
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveJournalArgs {
    pub ref_id: EntityId,
}

pub struct ArchiveJournal;

impl UseCase for ArchiveJournal {
    const NAME: &'static str = "journal-archive";
    type Args = ArchiveJournalArgs;
    type Output = Journal;
}

impl LoggedInMutationUseCase for ArchiveJournal {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: ArchiveJournalArgs,
    ) -> UseCaseResult<Journal> {
        session.require(WorkspaceFeature::Journals)?;
        let journal = uow.repository::<Journal>().load_by_id(args.ref_id, false)?;
        let mut archiver = ArchiveService::new(uow, *ctx, ArchivalReason::User);
        Ok(archiver.archive_entity(journal)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindJournalsArgs {
    pub include_archived: bool,
    pub period: Option<RecurringTaskPeriod>,
}

pub struct FindJournals;

impl UseCase for FindJournals {
    const NAME: &'static str = "journal-find";
    type Args = FindJournalsArgs;
    type Output = Vec<Journal>;
}

impl LoggedInReadonlyUseCase for FindJournals {
    fn execute(
        &self,
        view: &ReadView<'_>,
        session: &Session,
        args: FindJournalsArgs,
    ) -> UseCaseResult<Vec<Journal>> {
        session.require(WorkspaceFeature::Journals)?;
        let collection = view
            .repository::<JournalCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let filter = EntityFilter {
            include_archived: args.include_archived,
            ..EntityFilter::default()
        };
        let mut journals = view
            .repository::<Journal>()
            .find_all_with_filters(collection.ref_id(), &filter)?;
        if let Some(period) = args.period {
            journals.retain(|j| j.period() == period);
        }
        journals.sort_by(|a, b| b.right_now().cmp(&a.right_now()));
        Ok(journals)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateJournalPeriodsArgs {
    pub periods: BTreeSet<RecurringTaskPeriod>,
}

/// Sets the periods journals are generated for. Generated journals of a
/// dropped period stay until the next GC sweep.
pub struct UpdateJournalPeriods;

impl UseCase for UpdateJournalPeriods {
    const NAME: &'static str = "journal-periods-update";
    type Args = UpdateJournalPeriodsArgs;
    type Output = JournalCollection;
}

impl LoggedInMutationUseCase for UpdateJournalPeriods {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateJournalPeriodsArgs,
    ) -> UseCaseResult<JournalCollection> {
        session.require(WorkspaceFeature::Journals)?;
        let repository = uow.repository::<JournalCollection>();
        let mut collection = repository.load_by_parent(session.workspace_ref_id())?;
        collection.update_periods(ctx, args.periods)?;
        Ok(repository.save(collection)?)
    }
}

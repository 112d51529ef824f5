use super::contract::*;
use super::error::UseCaseResult;
use crate::db::{LeafEntityRepository, Repositories, TrunkEntityRepository, UnitOfWork};
use crate::models::*;
use crate::services::{ArchiveService, GenerationSummary, HabitGenerationService};

#[derive(Debug, Clone)]
pub struct CreateHabitArgs {
    pub name: EntityName,
    pub project_ref_id: EntityId,
    pub schedule: HabitSchedule,
}

pub struct CreateHabit;

impl UseCase for CreateHabit {
    const NAME: &'static str = "habit-create";
    type Args = CreateHabitArgs;
    type Output = Habit;
}

impl LoggedInMutationUseCase for CreateHabit {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateHabitArgs,
    ) -> UseCaseResult<Habit> {
        session.require(WorkspaceFeature::Habits)?;
        let collection = uow
            .repository::<HabitCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let project = uow
            .repository::<Project>()
            .load_by_id(args.project_ref_id, false)?;
        let habit = Habit::new_habit(
            ctx,
            collection.live_link()?,
            project.live_link()?,
            args.name,
            args.schedule,
        )?;
        Ok(uow.repository::<Habit>().create(habit)?)
    }
}

/// Every field is optional; `None` leaves it as is.
#[derive(Debug, Clone)]
pub struct UpdateHabitArgs {
    pub ref_id: EntityId,
    pub name: Option<EntityName>,
    pub schedule: Option<HabitSchedule>,
    pub project_ref_id: Option<EntityId>,
    pub suspended: Option<bool>,
}

pub struct UpdateHabit;

impl UseCase for UpdateHabit {
    const NAME: &'static str = "habit-update";
    type Args = UpdateHabitArgs;
    type Output = Habit;
}

impl LoggedInMutationUseCase for UpdateHabit {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateHabitArgs,
    ) -> UseCaseResult<Habit> {
        session.require(WorkspaceFeature::Habits)?;
        let repository = uow.repository::<Habit>();
        let mut habit = repository.load_by_id(args.ref_id, false)?;

        if args.name.is_some() || args.schedule.is_some() {
            let name = args.name.unwrap_or_else(|| habit.name().clone());
            let schedule = args.schedule.unwrap_or_else(|| habit.schedule());
            habit.update(ctx, name, schedule)?;
        }
        if let Some(project_ref_id) = args.project_ref_id {
            let project = uow.repository::<Project>().load_by_id(project_ref_id, false)?;
            habit.change_project(ctx, project.live_link()?)?;
        }
        if let Some(suspended) = args.suspended {
            habit.set_suspended(ctx, suspended)?;
        }
        Ok(repository.save(habit)?)
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveHabitArgs {
    pub ref_id: EntityId,
}

/// Archives a habit and the inbox tasks generated from it.
pub struct ArchiveHabit;

impl UseCase for ArchiveHabit {
    const NAME: &'static str = "habit-archive";
    type Args = ArchiveHabitArgs;
    type Output = Habit;
}

impl LoggedInMutationUseCase for ArchiveHabit {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: ArchiveHabitArgs,
    ) -> UseCaseResult<Habit> {
        session.require(WorkspaceFeature::Habits)?;
        let habit = uow.repository::<Habit>().load_by_id(args.ref_id, false)?;
        let mut archiver = ArchiveService::new(uow, *ctx, ArchivalReason::User);
        Ok(archiver.archive_habit(habit)?)
    }
}

#[derive(Debug, Clone)]
pub struct GenerateHabitTasksArgs {
    /// Generation covers the period instance containing this date.
    pub today: ADate,
    /// Restricts generation to these habits.
    pub habit_ref_ids: Option<Vec<EntityId>>,
}

pub struct GenerateHabitTasks;

impl UseCase for GenerateHabitTasks {
    const NAME: &'static str = "habit-gen";
    type Args = GenerateHabitTasksArgs;
    type Output = GenerationSummary;
}

impl LoggedInMutationUseCase for GenerateHabitTasks {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: GenerateHabitTasksArgs,
    ) -> UseCaseResult<GenerationSummary> {
        session.require(WorkspaceFeature::Habits)?;
        session.require(WorkspaceFeature::InboxTasks)?;
        let ctx = DomainContext::new(EventSource::Gen, ctx.action_timestamp);
        Ok(HabitGenerationService::new(uow, ctx).generate(
            session.workspace_ref_id(),
            args.today,
            args.habit_ref_ids,
        )?)
    }
}

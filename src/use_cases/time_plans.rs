use std::collections::BTreeSet;

use super::contract::*;
use super::error::{UseCaseError, UseCaseResult};
use crate::db::{
    BranchEntityRepository, LeafEntityRepository, Repositories, TimePlanRepository,
    TrunkEntityRepository, UnitOfWork,
};
use crate::models::*;

#[derive(Debug, Clone)]
pub struct CreateTimePlanArgs {
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
}

pub struct CreateTimePlan;

impl UseCase for CreateTimePlan {
    const NAME: &'static str = "time-plan-create";
    type Args = CreateTimePlanArgs;
    type Output = TimePlan;
}

impl LoggedInMutationUseCase for CreateTimePlan {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateTimePlanArgs,
    ) -> UseCaseResult<TimePlan> {
        session.require(WorkspaceFeature::TimePlans)?;
        let domain = uow
            .repository::<TimePlanDomain>()
            .load_by_parent(session.workspace_ref_id())?;
        let timeline = args.period.timeline(args.right_now);
        let repository = uow.repository::<TimePlan>();
        if repository
            .load_by_period_and_timeline(domain.ref_id(), args.period, &timeline)?
            .is_some()
        {
            return Err(UseCaseError::Conflict(format!(
                "a {} time plan for {timeline} already exists",
                args.period
            )));
        }
        let plan = TimePlan::new_time_plan(
            ctx,
            domain.live_link()?,
            TimePlanSource::User,
            args.right_now,
            args.period,
        )?;
        Ok(repository.create(plan)?)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateTimePlanArgs {
    pub ref_id: EntityId,
    pub right_now: ADate,
    pub period: RecurringTaskPeriod,
}

/// Moves a user time plan to the period instance containing `right_now`.
pub struct UpdateTimePlan;

impl UseCase for UpdateTimePlan {
    const NAME: &'static str = "time-plan-update";
    type Args = UpdateTimePlanArgs;
    type Output = TimePlan;
}

impl LoggedInMutationUseCase for UpdateTimePlan {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateTimePlanArgs,
    ) -> UseCaseResult<TimePlan> {
        session.require(WorkspaceFeature::TimePlans)?;
        let repository = uow.repository::<TimePlan>();
        let mut plan = repository.load_by_id(args.ref_id, false)?;
        let timeline = args.period.timeline(args.right_now);
        let taken = repository
            .load_by_period_and_timeline(plan.parent_link().ref_id(), args.period, &timeline)?
            .is_some_and(|other| other.ref_id() != plan.ref_id());
        if taken {
            return Err(UseCaseError::Conflict(format!(
                "a {} time plan for {timeline} already exists",
                args.period
            )));
        }
        plan.change_time_config(ctx, args.right_now, args.period)?;
        Ok(repository.save(plan)?)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateTimePlanPeriodsArgs {
    pub periods: BTreeSet<RecurringTaskPeriod>,
}

/// Sets the periods time plans are generated for.
pub struct UpdateTimePlanPeriods;

impl UseCase for UpdateTimePlanPeriods {
    const NAME: &'static str = "time-plan-periods-update";
    type Args = UpdateTimePlanPeriodsArgs;
    type Output = TimePlanDomain;
}

impl LoggedInMutationUseCase for UpdateTimePlanPeriods {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateTimePlanPeriodsArgs,
    ) -> UseCaseResult<TimePlanDomain> {
        session.require(WorkspaceFeature::TimePlans)?;
        let repository = uow.repository::<TimePlanDomain>();
        let mut domain = repository.load_by_parent(session.workspace_ref_id())?;
        domain.update_periods(ctx, args.periods)?;
        Ok(repository.save(domain)?)
    }
}

#[derive(Debug, Clone)]
pub struct CreateTimePlanActivityArgs {
    pub time_plan_ref_id: EntityId,
    pub target: TimePlanActivityTarget,
    pub target_ref_id: EntityId,
    pub feasability: TimePlanActivityFeasability,
}

/// Plans a live inbox task or big plan into a time plan.
pub struct CreateTimePlanActivity;

impl UseCase for CreateTimePlanActivity {
    const NAME: &'static str = "time-plan-activity-create";
    type Args = CreateTimePlanActivityArgs;
    type Output = TimePlanActivity;
}

impl LoggedInMutationUseCase for CreateTimePlanActivity {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateTimePlanActivityArgs,
    ) -> UseCaseResult<TimePlanActivity> {
        session.require(WorkspaceFeature::TimePlans)?;
        let plan = uow
            .repository::<TimePlan>()
            .load_by_id(args.time_plan_ref_id, false)?;
        let target = match args.target {
            TimePlanActivityTarget::InboxTask => uow
                .repository::<InboxTask>()
                .load_by_id(args.target_ref_id, false)?
                .live_link()?,
            TimePlanActivityTarget::BigPlan => uow
                .repository::<BigPlan>()
                .load_by_id(args.target_ref_id, false)?
                .live_link()?,
        };
        let activity =
            TimePlanActivity::new_activity(ctx, plan.live_link()?, target, args.feasability)?;
        Ok(uow.repository::<TimePlanActivity>().create(activity)?)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateTimePlanActivityArgs {
    pub ref_id: EntityId,
    pub feasability: Option<TimePlanActivityFeasability>,
    pub doneness: Option<TimePlanActivityDoneness>,
}

pub struct UpdateTimePlanActivity;

impl UseCase for UpdateTimePlanActivity {
    const NAME: &'static str = "time-plan-activity-update";
    type Args = UpdateTimePlanActivityArgs;
    type Output = TimePlanActivity;
}

impl LoggedInMutationUseCase for UpdateTimePlanActivity {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateTimePlanActivityArgs,
    ) -> UseCaseResult<TimePlanActivity> {
        session.require(WorkspaceFeature::TimePlans)?;
        let repository = uow.repository::<TimePlanActivity>();
        let mut activity = repository.load_by_id(args.ref_id, false)?;
        if let Some(feasability) = args.feasability {
            activity.update_feasability(ctx, feasability)?;
        }
        if let Some(doneness) = args.doneness {
            activity.update_doneness(ctx, doneness)?;
        }
        Ok(repository.save(activity)?)
    }
}

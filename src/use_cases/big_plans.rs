use super::contract::*;
use super::error::UseCaseResult;
use crate::db::{LeafEntityRepository, Repositories, TrunkEntityRepository, UnitOfWork};
use crate::models::*;

#[derive(Debug, Clone)]
pub struct CreateBigPlanArgs {
    pub name: EntityName,
    pub project_ref_id: EntityId,
    pub suggested_date: SuggestedDate,
}

pub struct CreateBigPlan;

impl UseCase for CreateBigPlan {
    const NAME: &'static str = "big-plan-create";
    type Args = CreateBigPlanArgs;
    type Output = BigPlan;
}

impl LoggedInMutationUseCase for CreateBigPlan {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateBigPlanArgs,
    ) -> UseCaseResult<BigPlan> {
        session.require(WorkspaceFeature::BigPlans)?;
        let collection = uow
            .repository::<BigPlanCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let project = uow
            .repository::<Project>()
            .load_by_id(args.project_ref_id, false)?;
        let big_plan = BigPlan::new_big_plan(
            ctx,
            collection.live_link()?,
            args.name,
            project.live_link()?,
            args.suggested_date,
        )?;
        Ok(uow.repository::<BigPlan>().create(big_plan)?)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateBigPlanStatusArgs {
    pub ref_id: EntityId,
    pub status: BigPlanStatus,
}

pub struct UpdateBigPlanStatus;

impl UseCase for UpdateBigPlanStatus {
    const NAME: &'static str = "big-plan-status";
    type Args = UpdateBigPlanStatusArgs;
    type Output = BigPlan;
}

impl LoggedInMutationUseCase for UpdateBigPlanStatus {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateBigPlanStatusArgs,
    ) -> UseCaseResult<BigPlan> {
        session.require(WorkspaceFeature::BigPlans)?;
        let repository = uow.repository::<BigPlan>();
        let mut big_plan = repository.load_by_id(args.ref_id, false)?;
        big_plan.update_status(ctx, args.status)?;
        Ok(repository.save(big_plan)?)
    }
}

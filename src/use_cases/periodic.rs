use super::contract::*;
use super::error::UseCaseResult;
use crate::db::UnitOfWork;
use crate::models::*;
use crate::services::{PeriodicGenerationService, PeriodicSummary};

#[derive(Debug, Clone)]
pub struct GeneratePeriodicArgs {
    /// Generation covers the period instances containing this date.
    pub today: ADate,
}

/// Generated journals and time plans for every configured period. A
/// disabled feature is skipped rather than refused.
pub struct GeneratePeriodic;

impl UseCase for GeneratePeriodic {
    const NAME: &'static str = "periodic-gen";
    type Args = GeneratePeriodicArgs;
    type Output = PeriodicSummary;
}

impl LoggedInMutationUseCase for GeneratePeriodic {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: GeneratePeriodicArgs,
    ) -> UseCaseResult<PeriodicSummary> {
        let ctx = DomainContext::new(EventSource::Gen, ctx.action_timestamp);
        let generator = PeriodicGenerationService::new(uow, ctx);
        let flags = session.workspace.feature_flags();
        let mut summary = PeriodicSummary::default();
        if flags.is_enabled(WorkspaceFeature::Journals) {
            generator.generate_journals(session.workspace_ref_id(), args.today, &mut summary)?;
        }
        if flags.is_enabled(WorkspaceFeature::TimePlans) {
            generator.generate_time_plans(session.workspace_ref_id(), args.today, &mut summary)?;
        }
        tracing::info!(
            journals = summary.journals_created,
            time_plans = summary.time_plans_created,
            existing = summary.existing,
            "Periodic entities generated"
        );
        Ok(summary)
    }
}

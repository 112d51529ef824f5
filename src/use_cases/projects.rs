use serde::Serialize;

use super::contract::*;
use super::error::{UseCaseError, UseCaseResult};
use crate::db::{
    EntityFilter, LeafEntityRepository, ReadView, Repositories, TrunkEntityRepository, UnitOfWork,
};
use crate::models::*;
use crate::services::{ArchiveCounts, ArchiveService, GcRun};

#[derive(Debug, Clone)]
pub struct CreateProjectArgs {
    pub key: EntityKey,
    pub name: EntityName,
}

pub struct CreateProject;

impl UseCase for CreateProject {
    const NAME: &'static str = "project-create";
    type Args = CreateProjectArgs;
    type Output = Project;
}

impl LoggedInMutationUseCase for CreateProject {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateProjectArgs,
    ) -> UseCaseResult<Project> {
        let collection = uow
            .repository::<ProjectCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let project = Project::new_project(ctx, collection.live_link()?, args.key, args.name)?;
        Ok(uow.repository::<Project>().create(project)?)
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveProjectArgs {
    pub ref_id: EntityId,
    /// `user` or `gc`. A `gc` archival is recorded in the GC log.
    pub reason: ArchivalReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveProjectOutput {
    pub project: Project,
    pub archived: ArchiveCounts,
    pub gc_log_entry: Option<GcLogEntry>,
}

/// Archives a project together with its habits, big plans and inbox tasks.
pub struct ArchiveProject;

impl UseCase for ArchiveProject {
    const NAME: &'static str = "project-archive";
    type Args = ArchiveProjectArgs;
    type Output = ArchiveProjectOutput;
}

impl LoggedInMutationUseCase for ArchiveProject {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: ArchiveProjectArgs,
    ) -> UseCaseResult<ArchiveProjectOutput> {
        if args.reason == ArchivalReason::Sync {
            return Err(UseCaseError::Validation(
                "projects are not archived by sync".into(),
            ));
        }
        let project = uow
            .repository::<Project>()
            .load_by_id(args.ref_id, false)?;
        let key = project.key().clone();

        let mut archiver = ArchiveService::new(uow, *ctx, args.reason);
        let project = archiver.archive_project(project)?;
        let archived = archiver.into_counts();

        let gc_log_entry = if args.reason == ArchivalReason::Gc {
            let mut run = GcRun::start(
                EntityName::from_raw(&format!("archive project {key}"))?,
                ArchivalReason::Gc,
                ctx.action_timestamp,
            );
            run.absorb(&archived);
            Some(run.finish(uow, ctx, session.workspace_ref_id())?)
        } else {
            None
        };

        Ok(ArchiveProjectOutput {
            project,
            archived,
            gc_log_entry,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindProjectsArgs {
    pub include_archived: bool,
    pub keys: Option<Vec<EntityKey>>,
}

pub struct FindProjects;

impl UseCase for FindProjects {
    const NAME: &'static str = "project-find";
    type Args = FindProjectsArgs;
    type Output = Vec<Project>;
}

impl LoggedInReadonlyUseCase for FindProjects {
    fn execute(
        &self,
        view: &ReadView<'_>,
        session: &Session,
        args: FindProjectsArgs,
    ) -> UseCaseResult<Vec<Project>> {
        let collection = view
            .repository::<ProjectCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let filter = EntityFilter {
            include_archived: args.include_archived,
            key_in: args.keys,
            ref_id_in: None,
        };
        Ok(view
            .repository::<Project>()
            .find_all_with_filters(collection.ref_id(), &filter)?)
    }
}

//! Inbox tasks: hand-written and big-plan steps, paging and status reports.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::contract::*;
use super::error::{UseCaseError, UseCaseResult};
use crate::db::{
    EntityFilter, InboxTaskPage, InboxTaskRepository, LeafEntityRepository, ReadView,
    Repositories, TrunkEntityRepository, UnitOfWork,
};
use crate::models::*;
use crate::services::ArchiveService;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

// ============================================================
// Create / update / archive
// ============================================================

#[derive(Debug, Clone)]
pub struct CreateInboxTaskArgs {
    pub name: EntityName,
    pub project_ref_id: EntityId,
    /// Makes the task a step of this big plan.
    pub big_plan_ref_id: Option<EntityId>,
    pub suggested_date: SuggestedDate,
}

pub struct CreateInboxTask;

impl UseCase for CreateInboxTask {
    const NAME: &'static str = "inbox-task-create";
    type Args = CreateInboxTaskArgs;
    type Output = InboxTask;
}

impl LoggedInMutationUseCase for CreateInboxTask {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateInboxTaskArgs,
    ) -> UseCaseResult<InboxTask> {
        session.require(WorkspaceFeature::InboxTasks)?;
        let collection = uow
            .repository::<InboxTaskCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let project = uow
            .repository::<Project>()
            .load_by_id(args.project_ref_id, false)?;
        let big_plan = match args.big_plan_ref_id {
            Some(ref_id) => {
                session.require(WorkspaceFeature::BigPlans)?;
                let big_plan = uow.repository::<BigPlan>().load_by_id(ref_id, false)?;
                if big_plan.project_ref_id() != project.ref_id() {
                    return Err(UseCaseError::Validation(format!(
                        "big plan {ref_id} belongs to another project"
                    )));
                }
                Some(big_plan.live_link()?)
            }
            None => None,
        };
        let task = InboxTask::new_inbox_task(
            ctx,
            collection.live_link()?,
            args.name,
            project.live_link()?,
            big_plan,
            args.suggested_date,
        )?;
        Ok(uow.repository::<InboxTask>().create(task)?)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateInboxTaskArgs {
    pub ref_id: EntityId,
    pub name: Option<EntityName>,
    pub status: Option<InboxTaskStatus>,
    pub project_ref_id: Option<EntityId>,
    pub suggested_date: Option<SuggestedDate>,
}

/// Definition fields are refused on generated tasks; status is always open.
pub struct UpdateInboxTask;

impl UseCase for UpdateInboxTask {
    const NAME: &'static str = "inbox-task-update";
    type Args = UpdateInboxTaskArgs;
    type Output = InboxTask;
}

impl LoggedInMutationUseCase for UpdateInboxTask {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateInboxTaskArgs,
    ) -> UseCaseResult<InboxTask> {
        session.require(WorkspaceFeature::InboxTasks)?;
        let repository = uow.repository::<InboxTask>();
        let mut task = repository.load_by_id(args.ref_id, false)?;

        if let Some(name) = args.name {
            task.update_name(ctx, name)?;
        }
        if let Some(project_ref_id) = args.project_ref_id {
            let project = uow.repository::<Project>().load_by_id(project_ref_id, false)?;
            task.change_project(ctx, project.live_link()?)?;
        }
        if let Some(suggested_date) = args.suggested_date {
            task.update_suggested_date(ctx, suggested_date)?;
        }
        if let Some(status) = args.status {
            task.update_status(ctx, status)?;
        }
        Ok(repository.save(task)?)
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveInboxTaskArgs {
    pub ref_id: EntityId,
}

pub struct ArchiveInboxTask;

impl UseCase for ArchiveInboxTask {
    const NAME: &'static str = "inbox-task-archive";
    type Args = ArchiveInboxTaskArgs;
    type Output = InboxTask;
}

impl LoggedInMutationUseCase for ArchiveInboxTask {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: ArchiveInboxTaskArgs,
    ) -> UseCaseResult<InboxTask> {
        session.require(WorkspaceFeature::InboxTasks)?;
        let task = uow.repository::<InboxTask>().load_by_id(args.ref_id, false)?;
        let mut archiver = ArchiveService::new(uow, *ctx, ArchivalReason::User);
        Ok(archiver.archive_inbox_task(task)?)
    }
}

// ============================================================
// Paging
// ============================================================

/// Position after the last task of a page. Raw form is `<created_time>/<ref_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub created_time: Timestamp,
    pub ref_id: EntityId,
}

impl PageCursor {
    fn after(task: &InboxTask) -> Self {
        Self {
            created_time: task.core().created_time(),
            ref_id: task.ref_id(),
        }
    }

    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        let (created_time, ref_id) = raw
            .trim()
            .rsplit_once('/')
            .ok_or_else(|| InputValidationError::new(format!("invalid page cursor `{raw}`")))?;
        Ok(Self {
            created_time: Timestamp::from_raw(created_time)?,
            ref_id: EntityId::from_raw(ref_id)?,
        })
    }

    pub fn as_raw(&self) -> String {
        format!("{}/{}", self.created_time, self.ref_id)
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_raw())
    }
}

impl Serialize for PageCursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_raw())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindInboxTasksArgs {
    pub sources: Option<Vec<InboxTaskSource>>,
    pub include_archived: bool,
    pub after: Option<PageCursor>,
    /// Defaults to [`DEFAULT_PAGE_SIZE`].
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindInboxTasksOutput {
    pub tasks: Vec<InboxTask>,
    /// Set when the page is full; pass it back as `after`.
    pub next: Option<PageCursor>,
}

/// Inbox tasks ordered by creation, one page at a time.
pub struct FindInboxTasks;

impl UseCase for FindInboxTasks {
    const NAME: &'static str = "inbox-task-find";
    type Args = FindInboxTasksArgs;
    type Output = FindInboxTasksOutput;
}

impl LoggedInReadonlyUseCase for FindInboxTasks {
    fn execute(
        &self,
        view: &ReadView<'_>,
        session: &Session,
        args: FindInboxTasksArgs,
    ) -> UseCaseResult<FindInboxTasksOutput> {
        session.require(WorkspaceFeature::InboxTasks)?;
        let limit = args.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(UseCaseError::Validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let collection = view
            .repository::<InboxTaskCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let page = InboxTaskPage {
            sources: args.sources,
            include_archived: args.include_archived,
            after: args.after.map(|c| (c.created_time, c.ref_id)),
            limit,
        };
        let tasks = view
            .repository::<InboxTask>()
            .find_page(collection.ref_id(), &page)?;
        let next = if tasks.len() == limit as usize {
            tasks.last().map(PageCursor::after)
        } else {
            None
        };
        Ok(FindInboxTasksOutput { tasks, next })
    }
}

// ============================================================
// Report
// ============================================================

#[derive(Debug, Clone)]
pub struct InboxTaskReportArgs {
    pub breakdown: ReportBreakdown,
    /// Bucket size for the `periods` breakdown.
    pub period: RecurringTaskPeriod,
    pub include_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    pub key: String,
    pub label: String,
    pub total: u32,
    pub by_status: BTreeMap<InboxTaskStatus, u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxTaskReportOutput {
    pub breakdown: ReportBreakdown,
    pub total: u32,
    pub groups: Vec<ReportGroup>,
}

/// Counts inbox tasks per status, grouped along one breakdown axis.
pub struct InboxTaskReport;

impl UseCase for InboxTaskReport {
    const NAME: &'static str = "report";
    type Args = InboxTaskReportArgs;
    type Output = InboxTaskReportOutput;
}

impl LoggedInReadonlyUseCase for InboxTaskReport {
    fn execute(
        &self,
        view: &ReadView<'_>,
        session: &Session,
        args: InboxTaskReportArgs,
    ) -> UseCaseResult<InboxTaskReportOutput> {
        session.require(WorkspaceFeature::InboxTasks)?;
        let ws = session.workspace_ref_id();
        let filter = EntityFilter {
            include_archived: args.include_archived,
            ..EntityFilter::default()
        };
        let collection = view.repository::<InboxTaskCollection>().load_by_parent(ws)?;
        let tasks = view
            .repository::<InboxTask>()
            .find_all_with_filters(collection.ref_id(), &filter)?;

        let labels = group_labels(view, ws, args.breakdown)?;
        let mut groups: BTreeMap<String, ReportGroup> = BTreeMap::new();
        for task in &tasks {
            let Some(key) = group_key(task, args.breakdown, args.period) else {
                continue;
            };
            let group = groups.entry(key.clone()).or_insert_with(|| ReportGroup {
                label: labels.get(&key).cloned().unwrap_or_else(|| key.clone()),
                key,
                total: 0,
                by_status: BTreeMap::new(),
            });
            group.total += 1;
            *group.by_status.entry(task.status()).or_default() += 1;
        }

        let groups: Vec<ReportGroup> = groups.into_values().collect();
        Ok(InboxTaskReportOutput {
            breakdown: args.breakdown,
            total: groups.iter().map(|g| g.total).sum(),
            groups,
        })
    }
}

fn group_key(
    task: &InboxTask,
    breakdown: ReportBreakdown,
    period: RecurringTaskPeriod,
) -> Option<String> {
    match breakdown {
        ReportBreakdown::Global => Some("global".to_string()),
        ReportBreakdown::Periods => Some(period.timeline(task.core().created_time().date()).as_raw()),
        ReportBreakdown::Projects => Some(task.project_ref_id().to_string()),
        ReportBreakdown::Habits => task.habit_ref_id().map(|id| id.to_string()),
        ReportBreakdown::BigPlans => task.big_plan_ref_id().map(|id| id.to_string()),
        // Chores are not modelled, so nothing falls in this breakdown.
        ReportBreakdown::Chores => None,
    }
}

/// Display names for the owners a breakdown groups by, archived ones included.
fn group_labels(
    view: &ReadView<'_>,
    workspace_ref_id: EntityId,
    breakdown: ReportBreakdown,
) -> UseCaseResult<BTreeMap<String, String>> {
    let labels = match breakdown {
        ReportBreakdown::Projects => {
            let collection = view
                .repository::<ProjectCollection>()
                .load_by_parent(workspace_ref_id)?;
            view.repository::<Project>()
                .find_all_with_filters(collection.ref_id(), &EntityFilter::all())?
                .into_iter()
                .map(|p| (p.ref_id().to_string(), p.key().to_string()))
                .collect()
        }
        ReportBreakdown::Habits => {
            let collection = view
                .repository::<HabitCollection>()
                .load_by_parent(workspace_ref_id)?;
            view.repository::<Habit>()
                .find_all_with_filters(collection.ref_id(), &EntityFilter::all())?
                .into_iter()
                .map(|h| (h.ref_id().to_string(), h.name().to_string()))
                .collect()
        }
        ReportBreakdown::BigPlans => {
            let collection = view
                .repository::<BigPlanCollection>()
                .load_by_parent(workspace_ref_id)?;
            view.repository::<BigPlan>()
                .find_all_with_filters(collection.ref_id(), &EntityFilter::all())?
                .into_iter()
                .map(|b| (b.ref_id().to_string(), b.name().to_string()))
                .collect()
        }
        ReportBreakdown::Global | ReportBreakdown::Periods | ReportBreakdown::Chores => {
            BTreeMap::new()
        }
    };
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_cursor_raw_form_round_trips() {
        let cursor = PageCursor {
            created_time: Timestamp::from_raw("2024-03-01T10:00:00Z").unwrap(),
            ref_id: EntityId::from_i64(17),
        };
        assert_eq!(PageCursor::from_raw(&cursor.as_raw()).unwrap(), cursor);
        assert!(PageCursor::from_raw("17").is_err());
    }
}

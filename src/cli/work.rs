//! Projects, habits, inbox tasks, big plans and the inbox report.

use clap::Args;
use serde_json::Value;

use super::{command, to_json, Command};
use crate::models::*;
use crate::use_cases::*;

pub(super) fn commands() -> Vec<Box<dyn Command>> {
    vec![
        command(CreateProject::NAME, "Create a project", project_create),
        command(ArchiveProject::NAME, "Archive a project and everything under it", project_archive),
        command(FindProjects::NAME, "List projects", project_find),
        command(CreateHabit::NAME, "Create a habit", habit_create),
        command(UpdateHabit::NAME, "Change a habit", habit_update),
        command(ArchiveHabit::NAME, "Archive a habit and its tasks", habit_archive),
        command(GenerateHabitTasks::NAME, "Generate inbox tasks from habits", habit_gen),
        command(CreateInboxTask::NAME, "Create an inbox task", inbox_task_create),
        command(UpdateInboxTask::NAME, "Change an inbox task", inbox_task_update),
        command(ArchiveInboxTask::NAME, "Archive an inbox task", inbox_task_archive),
        command(FindInboxTasks::NAME, "List inbox tasks, one page at a time", inbox_task_find),
        command(InboxTaskReport::NAME, "Count inbox tasks by status", report),
        command(CreateBigPlan::NAME, "Create a big plan", big_plan_create),
        command(UpdateBigPlanStatus::NAME, "Move a big plan to another status", big_plan_status),
    ]
}

// ============================================================
// Projects
// ============================================================

#[derive(Debug, Args)]
struct ProjectCreateCli {
    #[arg(long)]
    key: EntityKey,
    #[arg(long)]
    name: EntityName,
}

fn project_create(env: &UseCaseEnv, cli: ProjectCreateCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateProject,
        CreateProjectArgs {
            key: cli.key,
            name: cli.name,
        },
    )?)
}

#[derive(Debug, Args)]
struct ProjectArchiveCli {
    #[arg(long)]
    id: EntityId,
    /// `user`, or `gc` to record the archival in the GC log
    #[arg(long, default_value = "user")]
    reason: ArchivalReason,
}

fn project_archive(env: &UseCaseEnv, cli: ProjectArchiveCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &ArchiveProject,
        ArchiveProjectArgs {
            ref_id: cli.id,
            reason: cli.reason,
        },
    )?)
}

#[derive(Debug, Args)]
struct ProjectFindCli {
    #[arg(long)]
    include_archived: bool,
    #[arg(long = "key")]
    keys: Option<Vec<EntityKey>>,
}

fn project_find(env: &UseCaseEnv, cli: ProjectFindCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_readonly(
        &FindProjects,
        FindProjectsArgs {
            include_archived: cli.include_archived,
            keys: cli.keys,
        },
    )?)
}

// ============================================================
// Habits
// ============================================================

#[derive(Debug, Args)]
struct HabitCreateCli {
    #[arg(long)]
    name: EntityName,
    #[arg(long)]
    project_id: EntityId,
    #[arg(long)]
    period: RecurringTaskPeriod,
    #[arg(long, default_value = "all-same")]
    strategy: HabitRepeatsStrategy,
    #[arg(long, default_value_t = 1)]
    repeats: u32,
}

fn habit_create(env: &UseCaseEnv, cli: HabitCreateCli) -> UseCaseResult<Value> {
    let schedule = HabitSchedule::new(cli.period, cli.strategy, cli.repeats)?;
    to_json(env.run_logged_in_mutation(
        &CreateHabit,
        CreateHabitArgs {
            name: cli.name,
            project_ref_id: cli.project_id,
            schedule,
        },
    )?)
}

#[derive(Debug, Args)]
struct HabitUpdateCli {
    #[arg(long)]
    id: EntityId,
    #[arg(long)]
    name: Option<EntityName>,
    /// Replaces the schedule; needs `--strategy` and `--repeats` too
    #[arg(long, requires_all = ["strategy", "repeats"])]
    period: Option<RecurringTaskPeriod>,
    #[arg(long, requires = "period")]
    strategy: Option<HabitRepeatsStrategy>,
    #[arg(long, requires = "period")]
    repeats: Option<u32>,
    #[arg(long)]
    project_id: Option<EntityId>,
    #[arg(long)]
    suspended: Option<bool>,
}

fn habit_update(env: &UseCaseEnv, cli: HabitUpdateCli) -> UseCaseResult<Value> {
    let schedule = match (cli.period, cli.strategy, cli.repeats) {
        (Some(period), Some(strategy), Some(repeats)) => {
            Some(HabitSchedule::new(period, strategy, repeats)?)
        }
        _ => None,
    };
    to_json(env.run_logged_in_mutation(
        &UpdateHabit,
        UpdateHabitArgs {
            ref_id: cli.id,
            name: cli.name,
            schedule,
            project_ref_id: cli.project_id,
            suspended: cli.suspended,
        },
    )?)
}

#[derive(Debug, Args)]
struct RefIdCli {
    #[arg(long)]
    id: EntityId,
}

fn habit_archive(env: &UseCaseEnv, cli: RefIdCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(&ArchiveHabit, ArchiveHabitArgs { ref_id: cli.id })?)
}

#[derive(Debug, Args)]
struct HabitGenCli {
    /// Defaults to today
    #[arg(long)]
    date: Option<ADate>,
    #[arg(long = "habit-id")]
    habit_ids: Option<Vec<EntityId>>,
}

fn habit_gen(env: &UseCaseEnv, cli: HabitGenCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &GenerateHabitTasks,
        GenerateHabitTasksArgs {
            today: cli.date.unwrap_or_else(|| Timestamp::now().date()),
            habit_ref_ids: cli.habit_ids,
        },
    )?)
}

// ============================================================
// Inbox tasks
// ============================================================

#[derive(Debug, Args)]
struct InboxTaskCreateCli {
    #[arg(long)]
    name: EntityName,
    #[arg(long)]
    project_id: EntityId,
    #[arg(long)]
    big_plan_id: Option<EntityId>,
    #[arg(long)]
    actionable_date: Option<ADate>,
    #[arg(long)]
    due_date: Option<ADate>,
}

fn inbox_task_create(env: &UseCaseEnv, cli: InboxTaskCreateCli) -> UseCaseResult<Value> {
    let suggested_date = SuggestedDate::new(cli.actionable_date, cli.due_date)?;
    to_json(env.run_logged_in_mutation(
        &CreateInboxTask,
        CreateInboxTaskArgs {
            name: cli.name,
            project_ref_id: cli.project_id,
            big_plan_ref_id: cli.big_plan_id,
            suggested_date,
        },
    )?)
}

#[derive(Debug, Args)]
struct InboxTaskUpdateCli {
    #[arg(long)]
    id: EntityId,
    #[arg(long)]
    name: Option<EntityName>,
    #[arg(long)]
    status: Option<InboxTaskStatus>,
    #[arg(long)]
    project_id: Option<EntityId>,
    /// `actionable..due`, either side may be empty
    #[arg(long)]
    suggested_date: Option<String>,
}

fn inbox_task_update(env: &UseCaseEnv, cli: InboxTaskUpdateCli) -> UseCaseResult<Value> {
    let suggested_date = cli
        .suggested_date
        .as_deref()
        .map(SuggestedDate::from_raw)
        .transpose()?;
    to_json(env.run_logged_in_mutation(
        &UpdateInboxTask,
        UpdateInboxTaskArgs {
            ref_id: cli.id,
            name: cli.name,
            status: cli.status,
            project_ref_id: cli.project_id,
            suggested_date,
        },
    )?)
}

fn inbox_task_archive(env: &UseCaseEnv, cli: RefIdCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(&ArchiveInboxTask, ArchiveInboxTaskArgs { ref_id: cli.id })?)
}

#[derive(Debug, Args)]
struct InboxTaskFindCli {
    #[arg(long = "source")]
    sources: Option<Vec<InboxTaskSource>>,
    #[arg(long)]
    include_archived: bool,
    /// The `next` cursor of the previous page
    #[arg(long)]
    after: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
}

fn inbox_task_find(env: &UseCaseEnv, cli: InboxTaskFindCli) -> UseCaseResult<Value> {
    let after = cli.after.as_deref().map(PageCursor::from_raw).transpose()?;
    to_json(env.run_logged_in_readonly(
        &FindInboxTasks,
        FindInboxTasksArgs {
            sources: cli.sources,
            include_archived: cli.include_archived,
            after,
            limit: cli.limit,
        },
    )?)
}

#[derive(Debug, Args)]
struct ReportCli {
    #[arg(long, default_value = "global")]
    breakdown: ReportBreakdown,
    /// Bucket size for `--breakdown periods`
    #[arg(long, default_value = "weekly")]
    period: RecurringTaskPeriod,
    #[arg(long)]
    include_archived: bool,
}

fn report(env: &UseCaseEnv, cli: ReportCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_readonly(
        &InboxTaskReport,
        InboxTaskReportArgs {
            breakdown: cli.breakdown,
            period: cli.period,
            include_archived: cli.include_archived,
        },
    )?)
}

// ============================================================
// Big plans
// ============================================================

#[derive(Debug, Args)]
struct BigPlanCreateCli {
    #[arg(long)]
    name: EntityName,
    #[arg(long)]
    project_id: EntityId,
    #[arg(long)]
    actionable_date: Option<ADate>,
    #[arg(long)]
    due_date: Option<ADate>,
}

fn big_plan_create(env: &UseCaseEnv, cli: BigPlanCreateCli) -> UseCaseResult<Value> {
    let suggested_date = SuggestedDate::new(cli.actionable_date, cli.due_date)?;
    to_json(env.run_logged_in_mutation(
        &CreateBigPlan,
        CreateBigPlanArgs {
            name: cli.name,
            project_ref_id: cli.project_id,
            suggested_date,
        },
    )?)
}

#[derive(Debug, Args)]
struct BigPlanStatusCli {
    #[arg(long)]
    id: EntityId,
    #[arg(long)]
    status: BigPlanStatus,
}

fn big_plan_status(env: &UseCaseEnv, cli: BigPlanStatusCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &UpdateBigPlanStatus,
        UpdateBigPlanStatusArgs {
            ref_id: cli.id,
            status: cli.status,
        },
    )?)
}

//! Journals, notes, smart lists, time plans and schedule streams.

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use super::{command, to_json, Command};
use crate::models::*;
use crate::services::FeedEvent;
use crate::use_cases::*;

pub(super) fn commands() -> Vec<Box<dyn Command>> {
    vec![
        command(CreateJournal::NAME, "Create a journal for a period", journal_create),
        command(UpdateJournal::NAME, "Rename or move a journal", journal_update),
        command(ArchiveJournal::NAME, "Archive a journal", journal_archive),
        command(FindJournals::NAME, "List journals, newest first", journal_find),
        command(
            UpdateJournalPeriods::NAME,
            "Set the periods journals are generated for",
            journal_periods_update,
        ),
        command(CreateNote::NAME, "Create a note", note_create),
        command(CreateSmartList::NAME, "Create a smart list", smart_list_create),
        command(CreateSmartListItem::NAME, "Add an item to a smart list", smart_list_item_create),
        command(CreateTimePlan::NAME, "Create a time plan for a period", time_plan_create),
        command(UpdateTimePlan::NAME, "Move a user time plan", time_plan_update),
        command(
            UpdateTimePlanPeriods::NAME,
            "Set the periods time plans are generated for",
            time_plan_periods_update,
        ),
        command(
            GeneratePeriodic::NAME,
            "Generate journals and time plans for the configured periods",
            periodic_gen,
        ),
        command(
            CreateTimePlanActivity::NAME,
            "Plan an inbox task or big plan",
            time_plan_activity_create,
        ),
        command(
            UpdateTimePlanActivity::NAME,
            "Change how feasible or done a planned activity is",
            time_plan_activity_update,
        ),
        command(CreateScheduleStream::NAME, "Create a schedule stream", schedule_stream_create),
        command(
            SyncScheduleStream::NAME,
            "Apply a fetched feed to an imported stream",
            schedule_stream_sync,
        ),
    ]
}

#[derive(Debug, Args)]
struct PeriodCli {
    /// Defaults to today
    #[arg(long)]
    date: Option<ADate>,
    #[arg(long)]
    period: RecurringTaskPeriod,
}

impl PeriodCli {
    fn date(&self) -> ADate {
        self.date.unwrap_or_else(|| Timestamp::now().date())
    }
}

fn journal_create(env: &UseCaseEnv, cli: PeriodCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateJournal,
        CreateJournalArgs {
            right_now: cli.date(),
            period: cli.period,
        },
    )?)
}

#[derive(Debug, Args)]
struct JournalUpdateCli {
    #[arg(long)]
    id: EntityId,
    #[arg(long)]
    name: Option<EntityName>,
    #[arg(long, requires = "period")]
    date: Option<ADate>,
    #[arg(long, requires = "date")]
    period: Option<RecurringTaskPeriod>,
}

fn journal_update(env: &UseCaseEnv, cli: JournalUpdateCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &UpdateJournal,
        UpdateJournalArgs {
            ref_id: cli.id,
            name: cli.name,
            time_config: cli.date.zip(cli.period),
        },
    )?)
}

#[derive(Debug, Args)]
struct RefIdCli {
    #[arg(long)]
    id: EntityId,
}

fn journal_archive(env: &UseCaseEnv, cli: RefIdCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(&ArchiveJournal, ArchiveJournalArgs { ref_id: cli.id })?)
}

#[derive(Debug, Args)]
struct JournalFindCli {
    #[arg(long)]
    include_archived: bool,
    #[arg(long)]
    period: Option<RecurringTaskPeriod>,
}

fn journal_find(env: &UseCaseEnv, cli: JournalFindCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_readonly(
        &FindJournals,
        FindJournalsArgs {
            include_archived: cli.include_archived,
            period: cli.period,
        },
    )?)
}

#[derive(Debug, Args)]
struct PeriodsCli {
    /// Repeatable; none turns generation off
    #[arg(long = "period")]
    periods: Vec<RecurringTaskPeriod>,
}

fn journal_periods_update(env: &UseCaseEnv, cli: PeriodsCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &UpdateJournalPeriods,
        UpdateJournalPeriodsArgs {
            periods: cli.periods.into_iter().collect(),
        },
    )?)
}

#[derive(Debug, Args)]
struct NoteCreateCli {
    #[arg(long)]
    domain: NoteDomain,
    #[arg(long, default_value = "user")]
    source: NoteSource,
    /// The entity the note is attached to
    #[arg(long)]
    attached_to: Option<EntityId>,
    #[arg(long)]
    name: EntityName,
    #[arg(long, default_value = "")]
    content: String,
}

fn note_create(env: &UseCaseEnv, cli: NoteCreateCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateNote,
        CreateNoteArgs {
            domain: cli.domain,
            source: cli.source,
            source_entity_ref_id: cli.attached_to,
            name: cli.name,
            content: cli.content,
        },
    )?)
}

#[derive(Debug, Args)]
struct SmartListCreateCli {
    #[arg(long)]
    key: EntityKey,
    #[arg(long)]
    name: EntityName,
}

fn smart_list_create(env: &UseCaseEnv, cli: SmartListCreateCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateSmartList,
        CreateSmartListArgs {
            key: cli.key,
            name: cli.name,
        },
    )?)
}

#[derive(Debug, Args)]
struct SmartListItemCreateCli {
    #[arg(long)]
    list_id: EntityId,
    #[arg(long)]
    name: EntityName,
}

fn smart_list_item_create(env: &UseCaseEnv, cli: SmartListItemCreateCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateSmartListItem,
        CreateSmartListItemArgs {
            smart_list_ref_id: cli.list_id,
            name: cli.name,
        },
    )?)
}

fn time_plan_create(env: &UseCaseEnv, cli: PeriodCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateTimePlan,
        CreateTimePlanArgs {
            right_now: cli.date(),
            period: cli.period,
        },
    )?)
}

#[derive(Debug, Args)]
struct TimePlanUpdateCli {
    #[arg(long)]
    id: EntityId,
    #[command(flatten)]
    when: PeriodCli,
}

fn time_plan_update(env: &UseCaseEnv, cli: TimePlanUpdateCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &UpdateTimePlan,
        UpdateTimePlanArgs {
            ref_id: cli.id,
            right_now: cli.when.date(),
            period: cli.when.period,
        },
    )?)
}

fn time_plan_periods_update(env: &UseCaseEnv, cli: PeriodsCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &UpdateTimePlanPeriods,
        UpdateTimePlanPeriodsArgs {
            periods: cli.periods.into_iter().collect(),
        },
    )?)
}

#[derive(Debug, Args)]
struct PeriodicGenCli {
    /// Defaults to today
    #[arg(long)]
    date: Option<ADate>,
}

fn periodic_gen(env: &UseCaseEnv, cli: PeriodicGenCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &GeneratePeriodic,
        GeneratePeriodicArgs {
            today: cli.date.unwrap_or_else(|| Timestamp::now().date()),
        },
    )?)
}

#[derive(Debug, Args)]
struct TimePlanActivityCreateCli {
    #[arg(long)]
    plan_id: EntityId,
    #[arg(long)]
    target: TimePlanActivityTarget,
    #[arg(long)]
    target_id: EntityId,
    #[arg(long, default_value = "must-do")]
    feasability: TimePlanActivityFeasability,
}

fn time_plan_activity_create(
    env: &UseCaseEnv,
    cli: TimePlanActivityCreateCli,
) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateTimePlanActivity,
        CreateTimePlanActivityArgs {
            time_plan_ref_id: cli.plan_id,
            target: cli.target,
            target_ref_id: cli.target_id,
            feasability: cli.feasability,
        },
    )?)
}

#[derive(Debug, Args)]
struct ScheduleStreamCreateCli {
    #[arg(long)]
    name: EntityName,
    /// Makes an imported stream
    #[arg(long)]
    ical_url: Option<String>,
}

fn schedule_stream_create(env: &UseCaseEnv, cli: ScheduleStreamCreateCli) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &CreateScheduleStream,
        CreateScheduleStreamArgs {
            name: cli.name,
            source_ical_url: cli.ical_url,
        },
    )?)
}

#[derive(Debug, Args)]
struct ScheduleStreamSyncCli {
    #[arg(long)]
    id: EntityId,
    /// YAML or JSON list of `{uid, name, start_date, end_date}` events
    #[arg(long)]
    events: PathBuf,
}

fn schedule_stream_sync(env: &UseCaseEnv, cli: ScheduleStreamSyncCli) -> UseCaseResult<Value> {
    let raw = std::fs::read_to_string(&cli.events).map_err(|e| {
        UseCaseError::Validation(format!("cannot read {}: {e}", cli.events.display()))
    })?;
    let events: Vec<FeedEvent> = serde_yaml::from_str(&raw).map_err(|e| {
        UseCaseError::Validation(format!("invalid feed in {}: {e}", cli.events.display()))
    })?;
    to_json(env.run_logged_in_mutation(
        &SyncScheduleStream,
        SyncScheduleStreamArgs {
            ref_id: cli.id,
            events,
        },
    )?)
}

#[derive(Debug, Args)]
struct TimePlanActivityUpdateCli {
    #[arg(long)]
    id: EntityId,
    #[arg(long)]
    feasability: Option<TimePlanActivityFeasability>,
    #[arg(long)]
    doneness: Option<TimePlanActivityDoneness>,
}

fn time_plan_activity_update(
    env: &UseCaseEnv,
    cli: TimePlanActivityUpdateCli,
) -> UseCaseResult<Value> {
    to_json(env.run_logged_in_mutation(
        &UpdateTimePlanActivity,
        UpdateTimePlanActivityArgs {
            ref_id: cli.id,
            feasability: cli.feasability,
            doneness: cli.doneness,
        },
    )?)
}

//! Garbage collection: logical archival of orphans and stale generated
//! entities, recorded as a [`GcLogEntry`].

use std::collections::BTreeSet;

use super::archive::{ArchiveCounts, ArchiveService};
use crate::db::{
    Cancellation, DomainStorageEngine, EntityFilter, InboxTaskRepository, OptionalEntity,
    Repositories, SqliteRecord, StoreError, StoreResult, TrunkEntityRepository,
};
use crate::models::*;

/// Most archivals a single sweep transaction performs.
pub const GC_BATCH_SIZE: u32 = 50;

/// Accumulates what one GC run did, then writes its log entry.
#[derive(Debug, Clone)]
pub struct GcRun {
    name: EntityName,
    reason: ArchivalReason,
    started_time: Timestamp,
    counts: ArchiveCounts,
}

impl GcRun {
    pub fn start(name: EntityName, reason: ArchivalReason, started_time: Timestamp) -> Self {
        Self {
            name,
            reason,
            started_time,
            counts: ArchiveCounts::new(),
        }
    }

    pub fn absorb(&mut self, counts: &ArchiveCounts) {
        for (kind, count) in counts {
            *self.counts.entry(*kind).or_default() += count;
        }
    }

    pub fn counts(&self) -> &ArchiveCounts {
        &self.counts
    }

    /// Appends the run's entry to the workspace's GC log.
    pub fn finish<R: Repositories>(
        self,
        repos: &R,
        ctx: &DomainContext,
        workspace_ref_id: EntityId,
    ) -> StoreResult<GcLogEntry> {
        let gc_log = repos
            .repository::<GcLog>()
            .load_by_parent(workspace_ref_id)?;
        let entry = GcLogEntry::new_gc_log_entry(
            ctx,
            gc_log.live_link()?,
            self.name,
            self.reason,
            self.started_time,
            self.counts,
        )?;
        let entry = repos.repository::<GcLogEntry>().insert(entry)?;
        tracing::info!(
            name = %entry.name(),
            archived = entry.total_archived(),
            "GC run recorded"
        );
        Ok(entry)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GcOptions {
    /// Also archive inbox tasks and big plans that reached a final status.
    pub archive_done: bool,
}

/// One entity the sweep decided to archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    kind: EntityKind,
    ref_id: EntityId,
}

/// A live row pointing, through `column`, at an archived row of `target`.
struct OrphanLink {
    kind: EntityKind,
    column: &'static str,
    target: EntityKind,
    condition: &'static str,
}

const fn link(kind: EntityKind, column: &'static str, target: EntityKind) -> OrphanLink {
    OrphanLink {
        kind,
        column,
        target,
        condition: "",
    }
}

const ORPHAN_LINKS: &[OrphanLink] = &[
    link(EntityKind::Project, "project_collection_ref_id", EntityKind::ProjectCollection),
    link(EntityKind::Habit, "habit_collection_ref_id", EntityKind::HabitCollection),
    link(EntityKind::Habit, "project_ref_id", EntityKind::Project),
    link(EntityKind::InboxTask, "inbox_task_collection_ref_id", EntityKind::InboxTaskCollection),
    link(EntityKind::InboxTask, "project_ref_id", EntityKind::Project),
    link(EntityKind::InboxTask, "habit_ref_id", EntityKind::Habit),
    link(EntityKind::InboxTask, "big_plan_ref_id", EntityKind::BigPlan),
    link(EntityKind::BigPlan, "big_plan_collection_ref_id", EntityKind::BigPlanCollection),
    link(EntityKind::BigPlan, "project_ref_id", EntityKind::Project),
    link(EntityKind::Journal, "journal_collection_ref_id", EntityKind::JournalCollection),
    link(EntityKind::Note, "note_collection_ref_id", EntityKind::NoteCollection),
    OrphanLink {
        kind: EntityKind::Note,
        column: "source_entity_ref_id",
        target: EntityKind::InboxTask,
        condition: "c.domain = 'inbox-task'",
    },
    link(EntityKind::SmartList, "smart_list_collection_ref_id", EntityKind::SmartListCollection),
    link(EntityKind::SmartListItem, "smart_list_ref_id", EntityKind::SmartList),
    link(EntityKind::TimePlan, "time_plan_domain_ref_id", EntityKind::TimePlanDomain),
    link(EntityKind::TimePlanActivity, "time_plan_ref_id", EntityKind::TimePlan),
    OrphanLink {
        kind: EntityKind::TimePlanActivity,
        column: "target_ref_id",
        target: EntityKind::InboxTask,
        condition: "c.target = 'inbox-task'",
    },
    OrphanLink {
        kind: EntityKind::TimePlanActivity,
        column: "target_ref_id",
        target: EntityKind::BigPlan,
        condition: "c.target = 'big-plan'",
    },
    link(EntityKind::ScheduleStream, "schedule_domain_ref_id", EntityKind::ScheduleDomain),
    link(EntityKind::ScheduleEvent, "schedule_stream_ref_id", EntityKind::ScheduleStream),
];

pub struct GcService {
    engine: DomainStorageEngine,
}

impl GcService {
    pub fn new(engine: DomainStorageEngine) -> Self {
        Self { engine }
    }

    /// Sweeps the workspace. Each transaction archives at most
    /// [`GC_BATCH_SIZE`] entities, counting cascades; candidates are found
    /// afresh before every batch, so a cut-short cascade resumes through its
    /// orphans. The log entry is written last.
    ///
    /// Cancelling stops the sweep before its next batch. Batches already
    /// committed stay archived, but no log entry is written.
    pub fn sweep(
        &self,
        ctx: &DomainContext,
        workspace_ref_id: EntityId,
        options: GcOptions,
        cancellation: &Cancellation,
    ) -> StoreResult<GcLogEntry> {
        let mut run = GcRun::start(
            EntityName::from_generated(format!("gc sweep at {}", ctx.action_timestamp)),
            ArchivalReason::Gc,
            ctx.action_timestamp,
        );

        let mut batches = 0u32;
        loop {
            if cancellation.is_cancelled() {
                tracing::warn!(batches, "GC sweep cancelled");
                return Err(StoreError::Cancelled);
            }
            let candidates = self
                .engine
                .read_view(|view| find_candidates(view, workspace_ref_id, options))?;
            if candidates.is_empty() {
                break;
            }
            tracing::debug!(batch = batches, candidates = candidates.len(), "GC batch started");

            let counts = self.engine.unit_of_work_with(cancellation, |uow| {
                let mut archiver =
                    ArchiveService::new(uow, *ctx, ArchivalReason::Gc).with_limit(GC_BATCH_SIZE);
                for candidate in &candidates {
                    if archiver.is_exhausted() {
                        break;
                    }
                    archive_candidate(&mut archiver, uow, *candidate)?;
                }
                Ok::<_, StoreError>(archiver.into_counts())
            })?;
            batches += 1;
            run.absorb(&counts);
            if counts.values().sum::<u32>() == 0 {
                tracing::warn!(candidates = candidates.len(), "GC candidates left unarchived");
                break;
            }
        }
        tracing::info!(batches, "GC sweep finished");

        self.engine
            .unit_of_work_with(cancellation, |uow| run.finish(uow, ctx, workspace_ref_id))
    }
}

fn find_candidates<R: Repositories>(
    repos: &R,
    workspace_ref_id: EntityId,
    options: GcOptions,
) -> StoreResult<Vec<Candidate>> {
    let mut found = BTreeSet::new();
    find_orphans(repos.sqlite(), workspace_ref_id, &mut found)?;
    find_unconfigured_generated(repos, workspace_ref_id, &mut found)?;
    find_surplus_habit_tasks(repos, workspace_ref_id, &mut found)?;
    if options.archive_done {
        find_done(repos.sqlite(), workspace_ref_id, &mut found)?;
    }
    Ok(found.into_iter().collect())
}

/// SQL predicate on `c` restricting a row of `kind` to workspace `?1`,
/// through its owning trunk.
fn workspace_scope(kind: EntityKind) -> Option<&'static str> {
    let scope = match kind {
        EntityKind::Project => {
            "c.project_collection_ref_id IN (SELECT ref_id FROM project_collection WHERE workspace_ref_id = ?1)"
        }
        EntityKind::Habit => {
            "c.habit_collection_ref_id IN (SELECT ref_id FROM habit_collection WHERE workspace_ref_id = ?1)"
        }
        EntityKind::InboxTask => {
            "c.inbox_task_collection_ref_id IN (SELECT ref_id FROM inbox_task_collection WHERE workspace_ref_id = ?1)"
        }
        EntityKind::BigPlan => {
            "c.big_plan_collection_ref_id IN (SELECT ref_id FROM big_plan_collection WHERE workspace_ref_id = ?1)"
        }
        EntityKind::Journal => {
            "c.journal_collection_ref_id IN (SELECT ref_id FROM journal_collection WHERE workspace_ref_id = ?1)"
        }
        EntityKind::Note => {
            "c.note_collection_ref_id IN (SELECT ref_id FROM note_collection WHERE workspace_ref_id = ?1)"
        }
        EntityKind::SmartList => {
            "c.smart_list_collection_ref_id IN (SELECT ref_id FROM smart_list_collection WHERE workspace_ref_id = ?1)"
        }
        EntityKind::SmartListItem => {
            "c.smart_list_ref_id IN (SELECT l.ref_id FROM smart_list l
             JOIN smart_list_collection t ON l.smart_list_collection_ref_id = t.ref_id
             WHERE t.workspace_ref_id = ?1)"
        }
        EntityKind::TimePlan => {
            "c.time_plan_domain_ref_id IN (SELECT ref_id FROM time_plan_domain WHERE workspace_ref_id = ?1)"
        }
        EntityKind::TimePlanActivity => {
            "c.time_plan_ref_id IN (SELECT l.ref_id FROM time_plan l
             JOIN time_plan_domain t ON l.time_plan_domain_ref_id = t.ref_id
             WHERE t.workspace_ref_id = ?1)"
        }
        EntityKind::ScheduleStream => {
            "c.schedule_domain_ref_id IN (SELECT ref_id FROM schedule_domain WHERE workspace_ref_id = ?1)"
        }
        EntityKind::ScheduleEvent => {
            "c.schedule_stream_ref_id IN (SELECT l.ref_id FROM schedule_stream l
             JOIN schedule_domain t ON l.schedule_domain_ref_id = t.ref_id
             WHERE t.workspace_ref_id = ?1)"
        }
        _ => return None,
    };
    Some(scope)
}

fn scope_of(kind: EntityKind) -> StoreResult<&'static str> {
    workspace_scope(kind).ok_or_else(|| {
        StoreError::Domain(DomainError::InvalidState(format!(
            "GC cannot scope {kind} rows to a workspace"
        )))
    })
}

fn find_orphans(
    conn: &rusqlite::Connection,
    workspace_ref_id: EntityId,
    found: &mut BTreeSet<Candidate>,
) -> StoreResult<()> {
    for orphan in ORPHAN_LINKS {
        let extra = if orphan.condition.is_empty() {
            String::new()
        } else {
            format!(" AND {}", orphan.condition)
        };
        let sql = format!(
            "SELECT c.ref_id FROM {child} c JOIN {parent} p ON c.{column} = p.ref_id
             WHERE c.archived = 0 AND p.archived = 1 AND {scope}{extra}",
            child = orphan.kind.table(),
            parent = orphan.target.table(),
            column = orphan.column,
            scope = scope_of(orphan.kind)?,
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map([workspace_ref_id.as_i64()], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for id in ids {
            found.insert(Candidate {
                kind: orphan.kind,
                ref_id: EntityId::from_i64(id),
            });
        }
    }
    Ok(())
}

/// Generated journals and time plans whose period is no longer configured.
fn find_unconfigured_generated<R: Repositories>(
    repos: &R,
    workspace_ref_id: EntityId,
    found: &mut BTreeSet<Candidate>,
) -> StoreResult<()> {
    if let Some(collection) = load_trunk::<JournalCollection, R>(repos, workspace_ref_id)? {
        let journals = repos
            .repository::<Journal>()
            .filtered(collection.ref_id(), &EntityFilter::live())?;
        for journal in journals {
            if journal.source() == JournalSource::Generated
                && !collection.periods().contains(&journal.period())
            {
                found.insert(candidate(&journal));
            }
        }
    }
    if let Some(domain) = load_trunk::<TimePlanDomain, R>(repos, workspace_ref_id)? {
        let plans = repos
            .repository::<TimePlan>()
            .filtered(domain.ref_id(), &EntityFilter::live())?;
        for plan in plans {
            if plan.source() == TimePlanSource::Generated && !domain.periods().contains(&plan.period())
            {
                found.insert(candidate(&plan));
            }
        }
    }
    Ok(())
}

/// Habit tasks whose slot no longer exists in the habit's schedule: the
/// repeat index is past the count, or the timeline is not a canonical key of
/// the habit's current period.
fn find_surplus_habit_tasks<R: Repositories>(
    repos: &R,
    workspace_ref_id: EntityId,
    found: &mut BTreeSet<Candidate>,
) -> StoreResult<()> {
    let Some(collection) = load_trunk::<HabitCollection, R>(repos, workspace_ref_id)? else {
        return Ok(());
    };
    let habits = repos
        .repository::<Habit>()
        .filtered(collection.ref_id(), &EntityFilter::live())?;
    for habit in habits {
        let schedule = habit.schedule();
        let tasks = repos
            .repository::<InboxTask>()
            .find_for_habit(habit.ref_id(), false)?;
        for task in tasks {
            let stale = task.recurring().is_some_and(|slot| {
                slot.repeat_index >= schedule.repeats_in_period_count
                    || !is_timeline_of(schedule.period, &slot.timeline)
            });
            if stale {
                found.insert(candidate(&task));
            }
        }
    }
    Ok(())
}

fn is_timeline_of(period: RecurringTaskPeriod, timeline: &Timeline) -> bool {
    period
        .start_of_timeline(timeline)
        .is_ok_and(|start| period.timeline(start) == *timeline)
}

fn find_done(
    conn: &rusqlite::Connection,
    workspace_ref_id: EntityId,
    found: &mut BTreeSet<Candidate>,
) -> StoreResult<()> {
    for kind in [EntityKind::InboxTask, EntityKind::BigPlan] {
        let sql = format!(
            "SELECT c.ref_id FROM {} c
             WHERE c.archived = 0 AND c.status IN ('done', 'not-done') AND {}",
            kind.table(),
            scope_of(kind)?,
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map([workspace_ref_id.as_i64()], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        found.extend(ids.into_iter().map(|id| Candidate {
            kind,
            ref_id: EntityId::from_i64(id),
        }));
    }
    Ok(())
}

fn load_trunk<T, R>(repos: &R, workspace_ref_id: EntityId) -> StoreResult<Option<T>>
where
    T: SqliteRecord,
    R: Repositories,
{
    repos
        .repository::<T>()
        .load_single_by_parent(workspace_ref_id)
        .optional_entity()
}

fn candidate<T: Entity>(entity: &T) -> Candidate {
    Candidate {
        kind: T::KIND,
        ref_id: entity.ref_id(),
    }
}

fn archive_candidate<R: Repositories>(
    archiver: &mut ArchiveService<'_, R>,
    repos: &R,
    candidate: Candidate,
) -> StoreResult<()> {
    // An earlier cascade in the same sweep may already have archived the row.
    fn load<T: SqliteRecord, R: Repositories>(repos: &R, ref_id: EntityId) -> StoreResult<Option<T>> {
        repos.repository::<T>().load_row(ref_id, false).optional_entity()
    }

    let ref_id = candidate.ref_id;
    match candidate.kind {
        EntityKind::Project => {
            if let Some(project) = load::<Project, R>(repos, ref_id)? {
                archiver.archive_project(project)?;
            }
        }
        EntityKind::Habit => {
            if let Some(habit) = load::<Habit, R>(repos, ref_id)? {
                archiver.archive_habit(habit)?;
            }
        }
        EntityKind::InboxTask => {
            if let Some(task) = load::<InboxTask, R>(repos, ref_id)? {
                archiver.archive_inbox_task(task)?;
            }
        }
        EntityKind::BigPlan => {
            if let Some(big_plan) = load::<BigPlan, R>(repos, ref_id)? {
                archiver.archive_big_plan(big_plan)?;
            }
        }
        EntityKind::SmartList => {
            if let Some(list) = load::<SmartList, R>(repos, ref_id)? {
                archiver.archive_smart_list(list)?;
            }
        }
        EntityKind::TimePlan => {
            if let Some(plan) = load::<TimePlan, R>(repos, ref_id)? {
                archiver.archive_time_plan(plan)?;
            }
        }
        EntityKind::ScheduleStream => {
            if let Some(stream) = load::<ScheduleStream, R>(repos, ref_id)? {
                archiver.archive_schedule_stream(stream)?;
            }
        }
        EntityKind::Journal => archive_plain::<Journal, R>(archiver, repos, ref_id)?,
        EntityKind::Note => archive_plain::<Note, R>(archiver, repos, ref_id)?,
        EntityKind::SmartListItem => archive_plain::<SmartListItem, R>(archiver, repos, ref_id)?,
        EntityKind::TimePlanActivity => {
            archive_plain::<TimePlanActivity, R>(archiver, repos, ref_id)?
        }
        EntityKind::ScheduleEvent => archive_plain::<ScheduleEvent, R>(archiver, repos, ref_id)?,
        other => tracing::warn!(kind = %other, %ref_id, "GC does not archive this kind"),
    }
    Ok(())
}

fn archive_plain<T: SqliteRecord, R: Repositories>(
    archiver: &mut ArchiveService<'_, R>,
    repos: &R,
    ref_id: EntityId,
) -> StoreResult<()> {
    if let Some(entity) = repos
        .repository::<T>()
        .load_row(ref_id, false)
        .optional_entity()?
    {
        archiver.archive_entity(entity)?;
    }
    Ok(())
}

//! Typed archival cascades.
//!
//! Archiving an entity archives everything it owns with the same context,
//! so a cascade shares one `archived_time` and one reason. Entities that are
//! already archived are left untouched, keeping their original reason.
//!
//! A service built [`ArchiveService::with_limit`] stops archiving once the
//! limit is reached. A cascade cut short leaves live children under an
//! archived parent, which the GC orphan pass picks up on its next batch.

use std::collections::BTreeMap;

use crate::db::{
    EntityFilter, InboxTaskRepository, NoteRepository, Repositories, SqliteRecord, StoreResult,
    TimePlanActivityRepository,
};
use crate::models::*;

/// Archived entities, per kind.
pub type ArchiveCounts = BTreeMap<EntityKind, u32>;

pub struct ArchiveService<'r, R> {
    repos: &'r R,
    ctx: DomainContext,
    reason: ArchivalReason,
    counts: ArchiveCounts,
    limit: Option<u32>,
}

impl<'r, R: Repositories> ArchiveService<'r, R> {
    pub fn new(repos: &'r R, ctx: DomainContext, reason: ArchivalReason) -> Self {
        Self {
            repos,
            ctx,
            reason,
            counts: ArchiveCounts::new(),
            limit: None,
        }
    }

    /// Caps the number of archivals this service performs.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.total() >= limit)
    }

    pub fn reason(&self) -> ArchivalReason {
        self.reason
    }

    pub fn counts(&self) -> &ArchiveCounts {
        &self.counts
    }

    pub fn into_counts(self) -> ArchiveCounts {
        self.counts
    }

    /// Archives a single entity without looking at what it owns.
    pub fn archive_entity<T: SqliteRecord>(&mut self, mut entity: T) -> StoreResult<T> {
        if self.is_exhausted() || !entity.mark_archived(&self.ctx, self.reason) {
            return Ok(entity);
        }
        let entity = self.repos.repository::<T>().update(entity)?;
        *self.counts.entry(T::KIND).or_default() += 1;
        tracing::debug!(kind = %T::KIND, ref_id = %entity.ref_id(), reason = %self.reason, "Archived");
        Ok(entity)
    }

    fn live_children<T: SqliteRecord>(&self, parent_ref_id: EntityId) -> StoreResult<Vec<T>> {
        self.repos
            .repository::<T>()
            .filtered(parent_ref_id, &EntityFilter::live())
    }

    fn archive_all<T: SqliteRecord>(&mut self, entities: Vec<T>) -> StoreResult<()> {
        for entity in entities {
            self.archive_entity(entity)?;
        }
        Ok(())
    }

    // ============================================================
    // Roots and trunks
    // ============================================================

    /// Archives a workspace and every trunk it owns.
    pub fn archive_workspace(&mut self, workspace: Workspace) -> StoreResult<Workspace> {
        let workspace = self.archive_entity(workspace)?;
        let ws = workspace.ref_id();

        for collection in self.live_children::<ProjectCollection>(ws)? {
            self.archive_project_collection(collection)?;
        }
        for collection in self.live_children::<HabitCollection>(ws)? {
            let collection = self.archive_entity(collection)?;
            for habit in self.live_children::<Habit>(collection.ref_id())? {
                self.archive_habit(habit)?;
            }
        }
        for collection in self.live_children::<InboxTaskCollection>(ws)? {
            let collection = self.archive_entity(collection)?;
            for task in self.live_children::<InboxTask>(collection.ref_id())? {
                self.archive_inbox_task(task)?;
            }
        }
        for collection in self.live_children::<BigPlanCollection>(ws)? {
            let collection = self.archive_entity(collection)?;
            for big_plan in self.live_children::<BigPlan>(collection.ref_id())? {
                self.archive_big_plan(big_plan)?;
            }
        }
        for collection in self.live_children::<JournalCollection>(ws)? {
            let collection = self.archive_entity(collection)?;
            let journals = self.live_children::<Journal>(collection.ref_id())?;
            self.archive_all(journals)?;
        }
        for collection in self.live_children::<NoteCollection>(ws)? {
            let collection = self.archive_entity(collection)?;
            let notes = self.live_children::<Note>(collection.ref_id())?;
            self.archive_all(notes)?;
        }
        for collection in self.live_children::<SmartListCollection>(ws)? {
            let collection = self.archive_entity(collection)?;
            for list in self.live_children::<SmartList>(collection.ref_id())? {
                self.archive_smart_list(list)?;
            }
        }
        for domain in self.live_children::<TimePlanDomain>(ws)? {
            let domain = self.archive_entity(domain)?;
            for plan in self.live_children::<TimePlan>(domain.ref_id())? {
                self.archive_time_plan(plan)?;
            }
        }
        for domain in self.live_children::<ScheduleDomain>(ws)? {
            let domain = self.archive_entity(domain)?;
            for stream in self.live_children::<ScheduleStream>(domain.ref_id())? {
                self.archive_schedule_stream(stream)?;
            }
        }
        for log in self.live_children::<GcLog>(ws)? {
            let log = self.archive_entity(log)?;
            let entries = self.live_children::<GcLogEntry>(log.ref_id())?;
            self.archive_all(entries)?;
        }
        Ok(workspace)
    }

    pub fn archive_project_collection(
        &mut self,
        collection: ProjectCollection,
    ) -> StoreResult<ProjectCollection> {
        let collection = self.archive_entity(collection)?;
        for project in self.live_children::<Project>(collection.ref_id())? {
            self.archive_project(project)?;
        }
        Ok(collection)
    }

    // ============================================================
    // Leaves and branches
    // ============================================================

    /// A project takes its habits, big plans and inbox tasks with it.
    pub fn archive_project(&mut self, project: Project) -> StoreResult<Project> {
        let project = self.archive_entity(project)?;
        if self.is_exhausted() {
            return Ok(project);
        }
        let ref_id = project.ref_id();

        let habits = self
            .repos
            .repository::<Habit>()
            .find_by_link("project_ref_id", ref_id, false)?;
        for habit in habits {
            self.archive_habit(habit)?;
        }
        let big_plans = self
            .repos
            .repository::<BigPlan>()
            .find_by_link("project_ref_id", ref_id, false)?;
        for big_plan in big_plans {
            self.archive_big_plan(big_plan)?;
        }
        let tasks = self
            .repos
            .repository::<InboxTask>()
            .find_for_project(ref_id, false)?;
        for task in tasks {
            self.archive_inbox_task(task)?;
        }
        Ok(project)
    }

    /// A habit takes the inbox tasks generated from it.
    pub fn archive_habit(&mut self, habit: Habit) -> StoreResult<Habit> {
        let habit = self.archive_entity(habit)?;
        if self.is_exhausted() {
            return Ok(habit);
        }
        let tasks = self
            .repos
            .repository::<InboxTask>()
            .find_for_habit(habit.ref_id(), false)?;
        for task in tasks {
            self.archive_inbox_task(task)?;
        }
        Ok(habit)
    }

    pub fn archive_big_plan(&mut self, big_plan: BigPlan) -> StoreResult<BigPlan> {
        let big_plan = self.archive_entity(big_plan)?;
        if self.is_exhausted() {
            return Ok(big_plan);
        }
        let tasks = self
            .repos
            .repository::<InboxTask>()
            .find_for_big_plan(big_plan.ref_id(), false)?;
        for task in tasks {
            self.archive_inbox_task(task)?;
        }
        let activities = self.repos.repository::<TimePlanActivity>().find_for_target(
            TimePlanActivityTarget::BigPlan,
            big_plan.ref_id(),
            false,
        )?;
        self.archive_all(activities)?;
        Ok(big_plan)
    }

    /// An inbox task takes its attached notes and the plan activities pointing at it.
    pub fn archive_inbox_task(&mut self, task: InboxTask) -> StoreResult<InboxTask> {
        let task = self.archive_entity(task)?;
        if self.is_exhausted() {
            return Ok(task);
        }
        let notes = self.repos.repository::<Note>().find_attached_to(
            NoteDomain::InboxTask,
            task.ref_id(),
            false,
        )?;
        self.archive_all(notes)?;
        let activities = self.repos.repository::<TimePlanActivity>().find_for_target(
            TimePlanActivityTarget::InboxTask,
            task.ref_id(),
            false,
        )?;
        self.archive_all(activities)?;
        Ok(task)
    }

    pub fn archive_smart_list(&mut self, list: SmartList) -> StoreResult<SmartList> {
        let list = self.archive_entity(list)?;
        if self.is_exhausted() {
            return Ok(list);
        }
        let items = self.live_children::<SmartListItem>(list.ref_id())?;
        self.archive_all(items)?;
        Ok(list)
    }

    pub fn archive_time_plan(&mut self, plan: TimePlan) -> StoreResult<TimePlan> {
        let plan = self.archive_entity(plan)?;
        if self.is_exhausted() {
            return Ok(plan);
        }
        let activities = self.live_children::<TimePlanActivity>(plan.ref_id())?;
        self.archive_all(activities)?;
        Ok(plan)
    }

    pub fn archive_schedule_stream(&mut self, stream: ScheduleStream) -> StoreResult<ScheduleStream> {
        let stream = self.archive_entity(stream)?;
        if self.is_exhausted() {
            return Ok(stream);
        }
        let events = self.live_children::<ScheduleEvent>(stream.ref_id())?;
        self.archive_all(events)?;
        Ok(stream)
    }
}

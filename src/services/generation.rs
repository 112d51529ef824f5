//! Turns habits into inbox tasks, and the journal and time plan trunks'
//! configured periods into generated journals and plans, for the period
//! instance containing a date.

use crate::db::{
    BranchEntityRepository, EntityFilter, InboxTaskRepository, JournalRepository,
    LeafEntityRepository, Repositories, StoreResult, TimePlanRepository, TrunkEntityRepository,
};
use crate::models::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct GenerationSummary {
    pub habits: u32,
    pub created: u32,
    pub refreshed: u32,
    pub unchanged: u32,
}

pub struct HabitGenerationService<'r, R> {
    repos: &'r R,
    ctx: DomainContext,
}

impl<'r, R: Repositories> HabitGenerationService<'r, R> {
    pub fn new(repos: &'r R, ctx: DomainContext) -> Self {
        Self { repos, ctx }
    }

    /// Generates for every live, non-suspended habit of the workspace, or
    /// only for `habit_ref_ids` when given.
    pub fn generate(
        &self,
        workspace_ref_id: EntityId,
        today: ADate,
        habit_ref_ids: Option<Vec<EntityId>>,
    ) -> StoreResult<GenerationSummary> {
        let habit_collection = self
            .repos
            .repository::<HabitCollection>()
            .load_by_parent(workspace_ref_id)?;
        let inbox_task_collection = self
            .repos
            .repository::<InboxTaskCollection>()
            .load_by_parent(workspace_ref_id)?;
        let inbox_link = inbox_task_collection.live_link()?;

        let mut filter = EntityFilter::live();
        filter.ref_id_in = habit_ref_ids;
        let habits = self
            .repos
            .repository::<Habit>()
            .find_all_with_filters(habit_collection.ref_id(), &filter)?;

        let mut summary = GenerationSummary::default();
        for habit in habits.iter().filter(|h| !h.is_suspended()) {
            self.generate_for_habit(habit, inbox_link, today, &mut summary)?;
            summary.habits += 1;
        }
        tracing::info!(
            habits = summary.habits,
            created = summary.created,
            refreshed = summary.refreshed,
            "Habit tasks generated"
        );
        Ok(summary)
    }

    fn generate_for_habit(
        &self,
        habit: &Habit,
        inbox_task_collection: ParentLink,
        today: ADate,
        summary: &mut GenerationSummary,
    ) -> StoreResult<()> {
        let schedule = habit.schedule();
        let (start, end) = schedule.period.bounds(today).map_err(DomainError::from)?;
        let timeline = schedule.period.timeline(today);
        let intervals = schedule
            .repeats_strategy
            .spread_tasks(start, end, schedule.repeats_in_period_count)
            .map_err(DomainError::from)?;

        let repository = self.repos.repository::<InboxTask>();
        for (repeat_index, (actionable, due)) in (0u32..).zip(intervals) {
            let name = task_name(habit, repeat_index, schedule.repeats_in_period_count);
            let suggested_date = SuggestedDate {
                actionable_date: Some(actionable),
                due_date: Some(due),
            };

            match repository.load_for_recurring_slot(habit.ref_id(), &timeline, repeat_index)? {
                Some(mut task) => {
                    if task.refresh_for_habit(
                        &self.ctx,
                        name,
                        habit.project_ref_id(),
                        suggested_date,
                    )? {
                        repository.save(task)?;
                        summary.refreshed += 1;
                    } else {
                        summary.unchanged += 1;
                    }
                }
                None => {
                    let task = InboxTask::new_inbox_task_for_habit(
                        &self.ctx,
                        inbox_task_collection,
                        name,
                        habit.project_ref_id(),
                        RecurringSlot {
                            habit_ref_id: habit.ref_id(),
                            timeline: timeline.clone(),
                            repeat_index,
                        },
                        suggested_date,
                    )?;
                    repository.create(task)?;
                    summary.created += 1;
                }
            }
        }
        Ok(())
    }
}

/// `Habit` for single repeats, `Habit [2/3]` otherwise. Falls back to the
/// bare habit name when the suffix would make it too long.
fn task_name(habit: &Habit, repeat_index: u32, count: u32) -> EntityName {
    if count == 1 {
        return habit.name().clone();
    }
    EntityName::from_raw(&format!("{} [{}/{}]", habit.name(), repeat_index + 1, count))
        .unwrap_or_else(|_| habit.name().clone())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PeriodicSummary {
    pub journals_created: u32,
    pub time_plans_created: u32,
    /// Period instances that already had a live journal or plan.
    pub existing: u32,
}

/// Creates one generated journal or time plan per configured period, unless
/// the period instance already has a live one of any source.
pub struct PeriodicGenerationService<'r, R> {
    repos: &'r R,
    ctx: DomainContext,
}

impl<'r, R: Repositories> PeriodicGenerationService<'r, R> {
    pub fn new(repos: &'r R, ctx: DomainContext) -> Self {
        Self { repos, ctx }
    }

    pub fn generate_journals(
        &self,
        workspace_ref_id: EntityId,
        today: ADate,
        summary: &mut PeriodicSummary,
    ) -> StoreResult<()> {
        let collection = self
            .repos
            .repository::<JournalCollection>()
            .load_by_parent(workspace_ref_id)?;
        let link = collection.live_link()?;
        let repository = self.repos.repository::<Journal>();
        for period in collection.periods().iter().copied() {
            let timeline = period.timeline(today);
            if repository
                .load_by_period_and_timeline(collection.ref_id(), period, &timeline)?
                .is_some()
            {
                summary.existing += 1;
                continue;
            }
            let journal =
                Journal::new_journal(&self.ctx, link, JournalSource::Generated, today, period)?;
            repository.create(journal)?;
            summary.journals_created += 1;
        }
        Ok(())
    }

    pub fn generate_time_plans(
        &self,
        workspace_ref_id: EntityId,
        today: ADate,
        summary: &mut PeriodicSummary,
    ) -> StoreResult<()> {
        let domain = self
            .repos
            .repository::<TimePlanDomain>()
            .load_by_parent(workspace_ref_id)?;
        let link = domain.live_link()?;
        let repository = self.repos.repository::<TimePlan>();
        for period in domain.periods().iter().copied() {
            let timeline = period.timeline(today);
            if repository
                .load_by_period_and_timeline(domain.ref_id(), period, &timeline)?
                .is_some()
            {
                summary.existing += 1;
                continue;
            }
            let plan =
                TimePlan::new_time_plan(&self.ctx, link, TimePlanSource::Generated, today, period)?;
            repository.create(plan)?;
            summary.time_plans_created += 1;
        }
        Ok(())
    }
}

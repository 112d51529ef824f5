use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{EntityKind, HabitRepeatsStrategy, RecurringTaskPeriod};
use super::values::{EntityId, EntityName, InputValidationError};

/// How often a habit repeats and how the repeats are laid out in a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HabitSchedule {
    pub period: RecurringTaskPeriod,
    pub repeats_strategy: HabitRepeatsStrategy,
    pub repeats_in_period_count: u32,
}

impl HabitSchedule {
    /// Rejects schedules that could never be generated.
    pub fn new(
        period: RecurringTaskPeriod,
        repeats_strategy: HabitRepeatsStrategy,
        repeats_in_period_count: u32,
    ) -> Result<Self, InputValidationError> {
        if repeats_in_period_count < 1 {
            return Err(InputValidationError::new(
                "repeats in period must be at least 1",
            ));
        }
        if repeats_strategy == HabitRepeatsStrategy::SpreadOutNoOverlap
            && repeats_in_period_count > period.min_days()
        {
            return Err(InputValidationError::new(format!(
                "cannot spread {repeats_in_period_count} repeats over a {period} period"
            )));
        }
        Ok(Self {
            period,
            repeats_strategy,
            repeats_in_period_count,
        })
    }
}

/// A recurring commitment. Generation turns each period instance into
/// `repeats_in_period_count` inbox tasks.
#[derive(Debug, Clone, Serialize)]
pub struct Habit {
    pub(crate) core: EntityCore,
    pub(crate) habit_collection: ParentLink,
    pub(crate) project_ref_id: EntityId,
    pub(crate) name: EntityName,
    pub(crate) schedule: HabitSchedule,
    pub(crate) suspended: bool,
}

impl Habit {
    pub fn new_habit(
        ctx: &DomainContext,
        habit_collection: ParentLink,
        project: ParentLink,
        name: EntityName,
        schedule: HabitSchedule,
    ) -> DomainResult<Self> {
        let habit_collection = habit_collection.expect_kind(EntityKind::HabitCollection)?;
        let project = project.expect_kind(EntityKind::Project)?;
        let core = EntityCore::new_live(
            ctx,
            "new_habit",
            json!({ "name": name, "project_ref_id": project.ref_id(), "schedule": schedule }),
        );
        Ok(Self {
            core,
            habit_collection,
            project_ref_id: project.ref_id(),
            name,
            schedule,
            suspended: false,
        })
    }

    pub fn project_ref_id(&self) -> EntityId {
        self.project_ref_id
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn schedule(&self) -> HabitSchedule {
        self.schedule
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn update(
        &mut self,
        ctx: &DomainContext,
        name: EntityName,
        schedule: HabitSchedule,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        self.core
            .touch(ctx, "update", json!({ "name": name, "schedule": schedule }));
        self.name = name;
        self.schedule = schedule;
        Ok(())
    }

    pub fn change_project(&mut self, ctx: &DomainContext, project: ParentLink) -> DomainResult<()> {
        self.ensure_live()?;
        let project = project.expect_kind(EntityKind::Project)?;
        self.core.touch(
            ctx,
            "change_project",
            json!({ "project_ref_id": project.ref_id() }),
        );
        self.project_ref_id = project.ref_id();
        Ok(())
    }

    pub fn set_suspended(&mut self, ctx: &DomainContext, suspended: bool) -> DomainResult<()> {
        self.ensure_live()?;
        if self.suspended == suspended {
            return Ok(());
        }
        self.core
            .touch(ctx, "set_suspended", json!({ "suspended": suspended }));
        self.suspended = suspended;
        Ok(())
    }
}

impl Entity for Habit {
    const KIND: EntityKind = EntityKind::Habit;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.habit_collection)
    }
}

impl LeafEntity for Habit {
    fn parent_link(&self) -> ParentLink {
        self.habit_collection
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.habit_collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_requires_at_least_one_repeat() {
        assert!(HabitSchedule::new(RecurringTaskPeriod::Weekly, HabitRepeatsStrategy::AllSame, 0).is_err());
    }

    #[test]
    fn spread_out_schedule_must_fit_the_shortest_period_instance() {
        assert!(HabitSchedule::new(
            RecurringTaskPeriod::Weekly,
            HabitRepeatsStrategy::SpreadOutNoOverlap,
            8
        )
        .is_err());
        assert!(HabitSchedule::new(
            RecurringTaskPeriod::Weekly,
            HabitRepeatsStrategy::SpreadOutNoOverlap,
            7
        )
        .is_ok());
        assert!(HabitSchedule::new(RecurringTaskPeriod::Daily, HabitRepeatsStrategy::AllSame, 3).is_ok());
    }
}

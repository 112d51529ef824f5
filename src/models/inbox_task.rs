use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{EntityKind, InboxTaskSource, InboxTaskStatus};
use super::values::{EntityId, EntityName, SuggestedDate, Timeline, Timestamp};

/// Recurrence coordinates of a habit-generated task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurringSlot {
    pub habit_ref_id: EntityId,
    pub timeline: Timeline,
    pub repeat_index: u32,
}

/// A single actionable item.
///
/// The `source` decides who owns the task's definition. Tasks created by a
/// habit keep their name, project and dates in sync with the habit; users may
/// still move them through statuses.
#[derive(Debug, Clone, Serialize)]
pub struct InboxTask {
    pub(crate) core: EntityCore,
    pub(crate) inbox_task_collection: ParentLink,
    pub(crate) source: InboxTaskSource,
    pub(crate) name: EntityName,
    pub(crate) status: InboxTaskStatus,
    pub(crate) project_ref_id: EntityId,
    pub(crate) big_plan_ref_id: Option<EntityId>,
    pub(crate) recurring: Option<RecurringSlot>,
    pub(crate) suggested_date: SuggestedDate,
    pub(crate) accepted_time: Option<Timestamp>,
    pub(crate) working_time: Option<Timestamp>,
    pub(crate) completed_time: Option<Timestamp>,
}

impl InboxTask {
    /// A task the user writes by hand, optionally as a step of a big plan.
    pub fn new_inbox_task(
        ctx: &DomainContext,
        inbox_task_collection: ParentLink,
        name: EntityName,
        project: ParentLink,
        big_plan: Option<ParentLink>,
        suggested_date: SuggestedDate,
    ) -> DomainResult<Self> {
        let inbox_task_collection =
            inbox_task_collection.expect_kind(EntityKind::InboxTaskCollection)?;
        let project = project.expect_kind(EntityKind::Project)?;
        let big_plan = big_plan
            .map(|link| link.expect_kind(EntityKind::BigPlan))
            .transpose()?;
        let source = if big_plan.is_some() {
            InboxTaskSource::BigPlan
        } else {
            InboxTaskSource::User
        };
        let core = EntityCore::new_live(
            ctx,
            "new_inbox_task",
            json!({
                "name": name,
                "source": source,
                "project_ref_id": project.ref_id(),
                "big_plan_ref_id": big_plan.map(|link| link.ref_id()),
            }),
        );
        Ok(Self {
            core,
            inbox_task_collection,
            source,
            name,
            status: InboxTaskStatus::Accepted,
            project_ref_id: project.ref_id(),
            big_plan_ref_id: big_plan.map(|link| link.ref_id()),
            recurring: None,
            suggested_date,
            accepted_time: Some(ctx.action_timestamp),
            working_time: None,
            completed_time: None,
        })
    }

    /// A task generated for one repeat of a habit in one period instance.
    pub fn new_inbox_task_for_habit(
        ctx: &DomainContext,
        inbox_task_collection: ParentLink,
        name: EntityName,
        project_ref_id: EntityId,
        slot: RecurringSlot,
        suggested_date: SuggestedDate,
    ) -> DomainResult<Self> {
        let inbox_task_collection =
            inbox_task_collection.expect_kind(EntityKind::InboxTaskCollection)?;
        let core = EntityCore::new_live(
            ctx,
            "new_inbox_task_for_habit",
            json!({ "name": name, "recurring": slot, "project_ref_id": project_ref_id }),
        );
        Ok(Self {
            core,
            inbox_task_collection,
            source: InboxTaskSource::Habit,
            name,
            status: InboxTaskStatus::Recurring,
            project_ref_id,
            big_plan_ref_id: None,
            recurring: Some(slot),
            suggested_date,
            accepted_time: None,
            working_time: None,
            completed_time: None,
        })
    }

    pub fn source(&self) -> InboxTaskSource {
        self.source
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn status(&self) -> InboxTaskStatus {
        self.status
    }

    pub fn project_ref_id(&self) -> EntityId {
        self.project_ref_id
    }

    pub fn big_plan_ref_id(&self) -> Option<EntityId> {
        self.big_plan_ref_id
    }

    pub fn recurring(&self) -> Option<&RecurringSlot> {
        self.recurring.as_ref()
    }

    pub fn habit_ref_id(&self) -> Option<EntityId> {
        self.recurring.as_ref().map(|slot| slot.habit_ref_id)
    }

    pub fn suggested_date(&self) -> SuggestedDate {
        self.suggested_date
    }

    pub fn accepted_time(&self) -> Option<Timestamp> {
        self.accepted_time
    }

    pub fn working_time(&self) -> Option<Timestamp> {
        self.working_time
    }

    pub fn completed_time(&self) -> Option<Timestamp> {
        self.completed_time
    }

    pub fn update_name(&mut self, ctx: &DomainContext, name: EntityName) -> DomainResult<()> {
        self.ensure_live()?;
        ensure_user_changes(Self::KIND, self.ref_id(), self.source, "name")?;
        self.core.touch(ctx, "update_name", json!({ "name": name }));
        self.name = name;
        Ok(())
    }

    pub fn update_suggested_date(
        &mut self,
        ctx: &DomainContext,
        suggested_date: SuggestedDate,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        ensure_user_changes(Self::KIND, self.ref_id(), self.source, "suggested_date")?;
        self.core.touch(
            ctx,
            "update_suggested_date",
            json!({ "suggested_date": suggested_date }),
        );
        self.suggested_date = suggested_date;
        Ok(())
    }

    pub fn change_project(&mut self, ctx: &DomainContext, project: ParentLink) -> DomainResult<()> {
        self.ensure_live()?;
        ensure_user_changes(Self::KIND, self.ref_id(), self.source, "project")?;
        let project = project.expect_kind(EntityKind::Project)?;
        self.core.touch(
            ctx,
            "change_project",
            json!({ "project_ref_id": project.ref_id() }),
        );
        self.project_ref_id = project.ref_id();
        Ok(())
    }

    /// Status moves are open to every source.
    pub fn update_status(
        &mut self,
        ctx: &DomainContext,
        status: InboxTaskStatus,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        if status == self.status {
            return Ok(());
        }
        if status == InboxTaskStatus::Recurring && self.source != InboxTaskSource::Habit {
            return Err(DomainError::InvalidState(format!(
                "only habit tasks can be {status}"
            )));
        }
        self.core.touch(ctx, "update_status", json!({ "status": status }));
        let stamp = self.core.last_modified_time();
        if status == InboxTaskStatus::Accepted || status.is_working() || status.is_completed() {
            self.accepted_time.get_or_insert(stamp);
        }
        if status.is_working() || status.is_completed() {
            self.working_time.get_or_insert(stamp);
        }
        self.completed_time = if status.is_completed() {
            Some(self.completed_time.unwrap_or(stamp))
        } else {
            None
        };
        self.status = status;
        Ok(())
    }

    /// Generator path: re-syncs the definition with the owning habit.
    pub(crate) fn refresh_for_habit(
        &mut self,
        ctx: &DomainContext,
        name: EntityName,
        project_ref_id: EntityId,
        suggested_date: SuggestedDate,
    ) -> DomainResult<bool> {
        self.ensure_live()?;
        if self.name == name
            && self.project_ref_id == project_ref_id
            && self.suggested_date == suggested_date
        {
            return Ok(false);
        }
        self.core.touch(
            ctx,
            "refresh_for_habit",
            json!({ "name": name, "project_ref_id": project_ref_id, "suggested_date": suggested_date }),
        );
        self.name = name;
        self.project_ref_id = project_ref_id;
        self.suggested_date = suggested_date;
        Ok(true)
    }
}

impl Entity for InboxTask {
    const KIND: EntityKind = EntityKind::InboxTask;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.inbox_task_collection)
    }
}

impl LeafEntity for InboxTask {
    fn parent_link(&self) -> ParentLink {
        self.inbox_task_collection
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.inbox_task_collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::EventSource;

    fn ctx(raw: &str) -> DomainContext {
        DomainContext::new(EventSource::Cli, Timestamp::from_raw(raw).unwrap())
    }

    fn habit_task() -> InboxTask {
        let mut task = InboxTask::new_inbox_task_for_habit(
            &ctx("2024-03-04T08:00:00Z"),
            ParentLink::new(EntityKind::InboxTaskCollection, EntityId::from_i64(1)),
            EntityName::from_raw("Stretch").unwrap(),
            EntityId::from_i64(2),
            RecurringSlot {
                habit_ref_id: EntityId::from_i64(3),
                timeline: Timeline::from_raw("2024-W10").unwrap(),
                repeat_index: 0,
            },
            SuggestedDate::default(),
        )
        .unwrap();
        task.core.assign_ref_id(EntityId::from_i64(10));
        task
    }

    #[test]
    fn habit_tasks_reject_user_edits_but_accept_status_moves() {
        let mut task = habit_task();
        let err = task
            .update_name(&ctx("2024-03-05T08:00:00Z"), EntityName::from_raw("Other").unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::ImmutableSource { field: "name", .. }));

        task.update_status(&ctx("2024-03-05T08:00:00Z"), InboxTaskStatus::Done)
            .unwrap();
        assert_eq!(task.status(), InboxTaskStatus::Done);
        assert!(task.completed_time().is_some());
        assert!(task.working_time().is_some());
    }

    #[test]
    fn leaving_a_completed_status_clears_the_completion_time() {
        let mut task = habit_task();
        task.update_status(&ctx("2024-03-05T08:00:00Z"), InboxTaskStatus::Done)
            .unwrap();
        task.update_status(&ctx("2024-03-06T08:00:00Z"), InboxTaskStatus::InProgress)
            .unwrap();
        assert!(task.completed_time().is_none());
    }

    #[test]
    fn generator_refresh_bypasses_source_gating() {
        let mut task = habit_task();
        let changed = task
            .refresh_for_habit(
                &ctx("2024-03-05T08:00:00Z"),
                EntityName::from_raw("Stretch twice").unwrap(),
                EntityId::from_i64(2),
                SuggestedDate::default(),
            )
            .unwrap();
        assert!(changed);
        assert_eq!(task.name().as_str(), "Stretch twice");
    }
}

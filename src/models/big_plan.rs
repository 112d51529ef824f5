use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{BigPlanStatus, EntityKind};
use super::values::{EntityId, EntityName, SuggestedDate, Timestamp};

/// A multi-step goal. Its steps are inbox tasks with `source = big-plan`.
#[derive(Debug, Clone, Serialize)]
pub struct BigPlan {
    pub(crate) core: EntityCore,
    pub(crate) big_plan_collection: ParentLink,
    pub(crate) name: EntityName,
    pub(crate) status: BigPlanStatus,
    pub(crate) project_ref_id: EntityId,
    pub(crate) suggested_date: SuggestedDate,
    pub(crate) accepted_time: Option<Timestamp>,
    pub(crate) working_time: Option<Timestamp>,
    pub(crate) completed_time: Option<Timestamp>,
}

impl BigPlan {
    pub fn new_big_plan(
        ctx: &DomainContext,
        big_plan_collection: ParentLink,
        name: EntityName,
        project: ParentLink,
        suggested_date: SuggestedDate,
    ) -> DomainResult<Self> {
        let big_plan_collection = big_plan_collection.expect_kind(EntityKind::BigPlanCollection)?;
        let project = project.expect_kind(EntityKind::Project)?;
        let core = EntityCore::new_live(
            ctx,
            "new_big_plan",
            json!({ "name": name, "project_ref_id": project.ref_id() }),
        );
        Ok(Self {
            core,
            big_plan_collection,
            name,
            status: BigPlanStatus::Accepted,
            project_ref_id: project.ref_id(),
            suggested_date,
            accepted_time: Some(ctx.action_timestamp),
            working_time: None,
            completed_time: None,
        })
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn status(&self) -> BigPlanStatus {
        self.status
    }

    pub fn project_ref_id(&self) -> EntityId {
        self.project_ref_id
    }

    pub fn suggested_date(&self) -> SuggestedDate {
        self.suggested_date
    }

    pub fn completed_time(&self) -> Option<Timestamp> {
        self.completed_time
    }

    pub fn update_name(&mut self, ctx: &DomainContext, name: EntityName) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(ctx, "update_name", json!({ "name": name }));
        self.name = name;
        Ok(())
    }

    pub fn update_status(&mut self, ctx: &DomainContext, status: BigPlanStatus) -> DomainResult<()> {
        self.ensure_live()?;
        if status == self.status {
            return Ok(());
        }
        self.core.touch(ctx, "update_status", json!({ "status": status }));
        let stamp = self.core.last_modified_time();
        self.accepted_time.get_or_insert(stamp);
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
}

impl Entity for BigPlan {
    const KIND: EntityKind = EntityKind::BigPlan;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.big_plan_collection)
    }
}

impl LeafEntity for BigPlan {
    fn parent_link(&self) -> ParentLink {
        self.big_plan_collection
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.big_plan_collection
    }
}

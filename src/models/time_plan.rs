use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{
    EntityKind, RecurringTaskPeriod, TimePlanActivityDoneness, TimePlanActivityFeasability,
    TimePlanActivityTarget, TimePlanSource,
};
use super::values::{ADate, EntityId, EntityName, Timeline};

/// A plan for one period instance, holding activities that point at inbox
/// tasks or big plans.
#[derive(Debug, Clone, Serialize)]
pub struct TimePlan {
    pub(crate) core: EntityCore,
    pub(crate) time_plan_domain: ParentLink,
    pub(crate) source: TimePlanSource,
    pub(crate) name: EntityName,
    pub(crate) period: RecurringTaskPeriod,
    pub(crate) timeline: Timeline,
    pub(crate) right_now: ADate,
}

impl TimePlan {
    pub fn new_time_plan(
        ctx: &DomainContext,
        time_plan_domain: ParentLink,
        source: TimePlanSource,
        right_now: ADate,
        period: RecurringTaskPeriod,
    ) -> DomainResult<Self> {
        let time_plan_domain = time_plan_domain.expect_kind(EntityKind::TimePlanDomain)?;
        let timeline = period.timeline(right_now);
        let name = EntityName::from_generated(format!("{period} plan for {timeline}"));
        let core = EntityCore::new_live(
            ctx,
            "new_time_plan",
            json!({ "source": source, "period": period, "timeline": timeline }),
        );
        Ok(Self {
            core,
            time_plan_domain,
            source,
            name,
            period,
            timeline,
            right_now,
        })
    }

    pub fn source(&self) -> TimePlanSource {
        self.source
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn period(&self) -> RecurringTaskPeriod {
        self.period
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn right_now(&self) -> ADate {
        self.right_now
    }

    pub fn change_time_config(
        &mut self,
        ctx: &DomainContext,
        right_now: ADate,
        period: RecurringTaskPeriod,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        ensure_user_changes(Self::KIND, self.ref_id(), self.source, "time_config")?;
        let timeline = period.timeline(right_now);
        self.core.touch(
            ctx,
            "change_time_config",
            json!({ "period": period, "timeline": timeline }),
        );
        self.name = EntityName::from_generated(format!("{period} plan for {timeline}"));
        self.period = period;
        self.timeline = timeline;
        self.right_now = right_now;
        Ok(())
    }
}

impl Entity for TimePlan {
    const KIND: EntityKind = EntityKind::TimePlan;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.time_plan_domain)
    }
}

impl BranchEntity for TimePlan {
    fn parent_link(&self) -> ParentLink {
        self.time_plan_domain
    }
}

/// One planned piece of work inside a time plan.
#[derive(Debug, Clone, Serialize)]
pub struct TimePlanActivity {
    pub(crate) core: EntityCore,
    pub(crate) time_plan: ParentLink,
    pub(crate) target: TimePlanActivityTarget,
    pub(crate) target_ref_id: EntityId,
    pub(crate) feasability: TimePlanActivityFeasability,
    pub(crate) doneness: TimePlanActivityDoneness,
}

impl TimePlanActivity {
    /// `target` must be a live inbox task or big plan.
    pub fn new_activity(
        ctx: &DomainContext,
        time_plan: ParentLink,
        target: ParentLink,
        feasability: TimePlanActivityFeasability,
    ) -> DomainResult<Self> {
        let time_plan = time_plan.expect_kind(EntityKind::TimePlan)?;
        let target_kind = match target.kind() {
            EntityKind::InboxTask => TimePlanActivityTarget::InboxTask,
            EntityKind::BigPlan => TimePlanActivityTarget::BigPlan,
            actual => {
                return Err(DomainError::IncompatibleParent {
                    expected: EntityKind::InboxTask,
                    actual,
                })
            }
        };
        let core = EntityCore::new_live(
            ctx,
            "new_time_plan_activity",
            json!({ "target": target_kind, "target_ref_id": target.ref_id(), "feasability": feasability }),
        );
        Ok(Self {
            core,
            time_plan,
            target: target_kind,
            target_ref_id: target.ref_id(),
            feasability,
            doneness: TimePlanActivityDoneness::NotDone,
        })
    }

    pub fn target(&self) -> TimePlanActivityTarget {
        self.target
    }

    pub fn target_ref_id(&self) -> EntityId {
        self.target_ref_id
    }

    pub fn feasability(&self) -> TimePlanActivityFeasability {
        self.feasability
    }

    pub fn doneness(&self) -> TimePlanActivityDoneness {
        self.doneness
    }

    pub fn update_feasability(
        &mut self,
        ctx: &DomainContext,
        feasability: TimePlanActivityFeasability,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        self.core
            .touch(ctx, "update_feasability", json!({ "feasability": feasability }));
        self.feasability = feasability;
        Ok(())
    }

    pub fn update_doneness(
        &mut self,
        ctx: &DomainContext,
        doneness: TimePlanActivityDoneness,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        if doneness == self.doneness {
            return Ok(());
        }
        self.core
            .touch(ctx, "update_doneness", json!({ "doneness": doneness }));
        self.doneness = doneness;
        Ok(())
    }
}

impl Entity for TimePlanActivity {
    const KIND: EntityKind = EntityKind::TimePlanActivity;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.time_plan)
    }
}

impl LeafEntity for TimePlanActivity {
    fn parent_link(&self) -> ParentLink {
        self.time_plan
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.time_plan
    }
}

//! Workspace trunks: the singleton collections every workspace owns.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{EntityKind, RecurringTaskPeriod};

/// Declares a trunk that carries nothing but its workspace link.
macro_rules! plain_trunk {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $event:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize)]
        pub struct $name {
            pub(crate) core: EntityCore,
            pub(crate) workspace: ParentLink,
        }

        impl $name {
            pub fn new(ctx: &DomainContext, workspace: ParentLink) -> DomainResult<Self> {
                let workspace = workspace.expect_kind(EntityKind::Workspace)?;
                Ok(Self {
                    core: EntityCore::new_live(
                        ctx,
                        $event,
                        json!({ "workspace_ref_id": workspace.ref_id() }),
                    ),
                    workspace,
                })
            }
        }

        impl Entity for $name {
            const KIND: EntityKind = $kind;

            fn core(&self) -> &EntityCore {
                &self.core
            }

            fn core_mut(&mut self) -> &mut EntityCore {
                &mut self.core
            }

            fn parent(&self) -> Option<ParentLink> {
                Some(self.workspace)
            }
        }

        impl TrunkEntity for $name {
            fn parent_link(&self) -> ParentLink {
                self.workspace
            }
        }
    };
}

plain_trunk!(ProjectCollection, EntityKind::ProjectCollection, "new_project_collection");
plain_trunk!(HabitCollection, EntityKind::HabitCollection, "new_habit_collection");
plain_trunk!(InboxTaskCollection, EntityKind::InboxTaskCollection, "new_inbox_task_collection");
plain_trunk!(BigPlanCollection, EntityKind::BigPlanCollection, "new_big_plan_collection");
plain_trunk!(NoteCollection, EntityKind::NoteCollection, "new_note_collection");
plain_trunk!(SmartListCollection, EntityKind::SmartListCollection, "new_smart_list_collection");
plain_trunk!(ScheduleDomain, EntityKind::ScheduleDomain, "new_schedule_domain");
plain_trunk!(
    /// Owner of the GC sweep history.
    GcLog,
    EntityKind::GcLog,
    "new_gc_log"
);

/// Journals trunk. `periods` lists the periods journals are generated for.
#[derive(Debug, Clone, Serialize)]
pub struct JournalCollection {
    pub(crate) core: EntityCore,
    pub(crate) workspace: ParentLink,
    pub(crate) periods: BTreeSet<RecurringTaskPeriod>,
}

impl JournalCollection {
    pub fn new(ctx: &DomainContext, workspace: ParentLink) -> DomainResult<Self> {
        let workspace = workspace.expect_kind(EntityKind::Workspace)?;
        let periods = BTreeSet::from([RecurringTaskPeriod::Weekly]);
        Ok(Self {
            core: EntityCore::new_live(
                ctx,
                "new_journal_collection",
                json!({ "workspace_ref_id": workspace.ref_id(), "periods": periods }),
            ),
            workspace,
            periods,
        })
    }

    pub fn periods(&self) -> &BTreeSet<RecurringTaskPeriod> {
        &self.periods
    }

    pub fn update_periods(
        &mut self,
        ctx: &DomainContext,
        periods: BTreeSet<RecurringTaskPeriod>,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(ctx, "update_periods", json!({ "periods": periods }));
        self.periods = periods;
        Ok(())
    }
}

impl Entity for JournalCollection {
    const KIND: EntityKind = EntityKind::JournalCollection;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.workspace)
    }
}

impl TrunkEntity for JournalCollection {
    fn parent_link(&self) -> ParentLink {
        self.workspace
    }
}

/// Time plans trunk. `periods` lists the periods plans are generated for.
#[derive(Debug, Clone, Serialize)]
pub struct TimePlanDomain {
    pub(crate) core: EntityCore,
    pub(crate) workspace: ParentLink,
    pub(crate) periods: BTreeSet<RecurringTaskPeriod>,
}

impl TimePlanDomain {
    pub fn new(ctx: &DomainContext, workspace: ParentLink) -> DomainResult<Self> {
        let workspace = workspace.expect_kind(EntityKind::Workspace)?;
        let periods = BTreeSet::from([RecurringTaskPeriod::Daily, RecurringTaskPeriod::Weekly]);
        Ok(Self {
            core: EntityCore::new_live(
                ctx,
                "new_time_plan_domain",
                json!({ "workspace_ref_id": workspace.ref_id(), "periods": periods }),
            ),
            workspace,
            periods,
        })
    }

    pub fn periods(&self) -> &BTreeSet<RecurringTaskPeriod> {
        &self.periods
    }

    pub fn update_periods(
        &mut self,
        ctx: &DomainContext,
        periods: BTreeSet<RecurringTaskPeriod>,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(ctx, "update_periods", json!({ "periods": periods }));
        self.periods = periods;
        Ok(())
    }
}

impl Entity for TimePlanDomain {
    const KIND: EntityKind = EntityKind::TimePlanDomain;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.workspace)
    }
}

impl TrunkEntity for TimePlanDomain {
    fn parent_link(&self) -> ParentLink {
        self.workspace
    }
}

use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{EntityKind, JournalSource, RecurringTaskPeriod};
use super::values::{ADate, EntityName, Timeline};

/// A reflection on one period instance.
///
/// Live journals are unique per `(collection, period, timeline)`. Generated
/// journals belong to the generator; only `source = user` journals can be
/// renamed or moved to another period.
#[derive(Debug, Clone, Serialize)]
pub struct Journal {
    pub(crate) core: EntityCore,
    pub(crate) journal_collection: ParentLink,
    pub(crate) source: JournalSource,
    pub(crate) name: EntityName,
    pub(crate) period: RecurringTaskPeriod,
    pub(crate) timeline: Timeline,
    pub(crate) right_now: ADate,
}

fn journal_name(period: RecurringTaskPeriod, timeline: &Timeline) -> EntityName {
    EntityName::from_generated(format!("{period} journal for {timeline}"))
}

impl Journal {
    pub fn new_journal(
        ctx: &DomainContext,
        journal_collection: ParentLink,
        source: JournalSource,
        right_now: ADate,
        period: RecurringTaskPeriod,
    ) -> DomainResult<Self> {
        let journal_collection = journal_collection.expect_kind(EntityKind::JournalCollection)?;
        let timeline = period.timeline(right_now);
        let name = journal_name(period, &timeline);
        let core = EntityCore::new_live(
            ctx,
            "new_journal",
            json!({ "source": source, "period": period, "timeline": timeline, "right_now": right_now }),
        );
        Ok(Self {
            core,
            journal_collection,
            source,
            name,
            period,
            timeline,
            right_now,
        })
    }

    pub fn source(&self) -> JournalSource {
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

    pub fn update_name(&mut self, ctx: &DomainContext, name: EntityName) -> DomainResult<()> {
        self.ensure_live()?;
        ensure_user_changes(Self::KIND, self.ref_id(), self.source, "name")?;
        self.core.touch(ctx, "update_name", json!({ "name": name }));
        self.name = name;
        Ok(())
    }

    /// Moves the journal to the period instance containing `right_now`.
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
            json!({ "period": period, "timeline": timeline, "right_now": right_now }),
        );
        self.name = journal_name(period, &timeline);
        self.period = period;
        self.timeline = timeline;
        self.right_now = right_now;
        Ok(())
    }
}

impl Entity for Journal {
    const KIND: EntityKind = EntityKind::Journal;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.journal_collection)
    }
}

impl LeafEntity for Journal {
    fn parent_link(&self) -> ParentLink {
        self.journal_collection
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.journal_collection
    }
}

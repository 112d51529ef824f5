use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{ArchivalReason, EntityKind, EventSource};
use super::values::{EntityName, Timestamp};

/// The record of one GC sweep: what ran, when, and how much it archived.
#[derive(Debug, Clone, Serialize)]
pub struct GcLogEntry {
    pub(crate) core: EntityCore,
    pub(crate) gc_log: ParentLink,
    pub(crate) name: EntityName,
    pub(crate) source: EventSource,
    pub(crate) archival_reason: ArchivalReason,
    pub(crate) started_time: Timestamp,
    pub(crate) finished_time: Timestamp,
    pub(crate) entity_counts: BTreeMap<EntityKind, u32>,
}

impl GcLogEntry {
    pub fn new_gc_log_entry(
        ctx: &DomainContext,
        gc_log: ParentLink,
        name: EntityName,
        archival_reason: ArchivalReason,
        started_time: Timestamp,
        entity_counts: BTreeMap<EntityKind, u32>,
    ) -> DomainResult<Self> {
        let gc_log = gc_log.expect_kind(EntityKind::GcLog)?;
        let finished_time = ctx.action_timestamp.max(started_time);
        let core = EntityCore::new_live(
            ctx,
            "new_gc_log_entry",
            json!({ "name": name, "archival_reason": archival_reason, "entity_counts": entity_counts }),
        );
        Ok(Self {
            core,
            gc_log,
            name,
            source: ctx.event_source,
            archival_reason,
            started_time,
            finished_time,
            entity_counts,
        })
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    pub fn archival_reason(&self) -> ArchivalReason {
        self.archival_reason
    }

    pub fn started_time(&self) -> Timestamp {
        self.started_time
    }

    pub fn finished_time(&self) -> Timestamp {
        self.finished_time
    }

    pub fn entity_counts(&self) -> &BTreeMap<EntityKind, u32> {
        &self.entity_counts
    }

    pub fn total_archived(&self) -> u32 {
        self.entity_counts.values().sum()
    }
}

impl Entity for GcLogEntry {
    const KIND: EntityKind = EntityKind::GcLogEntry;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.gc_log)
    }
}

impl LeafEntity for GcLogEntry {
    fn parent_link(&self) -> ParentLink {
        self.gc_log
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.gc_log
    }
}

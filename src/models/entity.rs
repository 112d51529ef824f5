//! The entity framework every domain object is built on.
//!
//! Entities come in four shapes (see [`EntityShape`]): roots have no parent,
//! trunks hang off a root (one live per root), branches off a trunk, and leaves
//! off a trunk or branch. Non-root entities carry a [`ParentLink`]; finding
//! children is always a repository query.
//!
//! All mutation goes through entity methods that take a [`DomainContext`].
//! The context stamps `last_modified_time` and records an [`EntityEvent`], so
//! lifecycle invariants hold without the storage layer knowing about them:
//!
//! - archived entities have both `archived_time` and `archival_reason`, live ones neither;
//! - `created_time <= last_modified_time <= archived_time`;
//! - `last_modified_time` never goes backwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::enums::{ArchivalReason, EntityKind, EventSource, SourceDiscriminator, WorkspaceFeature};
use super::values::{EntityId, InputValidationError, Timestamp};

/// Errors raised by entity methods.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(#[from] InputValidationError),

    #[error("cannot change `{field}` of {kind} {ref_id}: its source `{source_name}` does not allow user changes")]
    ImmutableSource {
        kind: EntityKind,
        ref_id: EntityId,
        source_name: String,
        field: &'static str,
    },

    #[error("{kind} {ref_id} is archived")]
    EntityArchived { kind: EntityKind, ref_id: EntityId },

    #[error("{kind} {ref_id} has not been saved yet")]
    EntityNotSaved { kind: EntityKind, ref_id: EntityId },

    #[error("expected a parent of kind {expected}, got {actual}")]
    IncompatibleParent {
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("feature `{0}` is not enabled for this workspace")]
    FeatureUnavailable(WorkspaceFeature),

    #[error("{0}")]
    InvalidState(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Captured once at the use-case boundary and threaded into every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainContext {
    pub event_source: EventSource,
    pub action_timestamp: Timestamp,
}

impl DomainContext {
    pub fn new(event_source: EventSource, action_timestamp: Timestamp) -> Self {
        Self {
            event_source,
            action_timestamp,
        }
    }

    pub fn now(event_source: EventSource) -> Self {
        Self::new(event_source, Timestamp::now())
    }
}

/// One-way owned edge from a child to its parent.
///
/// Outside the crate a link can only be obtained from a live entity through
/// [`Entity::live_link`], which is how "parent must be live" is checked at
/// creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentLink {
    kind: EntityKind,
    ref_id: EntityId,
}

impl ParentLink {
    pub(crate) fn new(kind: EntityKind, ref_id: EntityId) -> Self {
        Self { kind, ref_id }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn ref_id(&self) -> EntityId {
        self.ref_id
    }

    /// Checks the link points at the expected parent kind.
    pub fn expect_kind(self, expected: EntityKind) -> DomainResult<Self> {
        if self.kind != expected {
            return Err(DomainError::IncompatibleParent {
                expected,
                actual: self.kind,
            });
        }
        Ok(self)
    }
}

impl fmt::Display for ParentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.ref_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityEventKind {
    Created,
    Updated,
    Archived,
}

impl EntityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// A recorded mutation. Persisted to `entity_event` when the entity is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvent {
    /// The domain method that produced the event, e.g. `update_name`.
    pub name: String,
    pub kind: EntityEventKind,
    pub source: EventSource,
    pub timestamp: Timestamp,
    pub data: JsonValue,
}

/// Identity and lifecycle state shared by every entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCore {
    ref_id: EntityId,
    created_time: Timestamp,
    last_modified_time: Timestamp,
    archived: bool,
    archived_time: Option<Timestamp>,
    archival_reason: Option<ArchivalReason>,
    #[serde(skip)]
    pending_events: Vec<EntityEvent>,
}

impl EntityCore {
    /// A fresh live core, with its creation event recorded.
    pub fn new_live(ctx: &DomainContext, name: &str, data: JsonValue) -> Self {
        Self {
            ref_id: EntityId::NEW,
            created_time: ctx.action_timestamp,
            last_modified_time: ctx.action_timestamp,
            archived: false,
            archived_time: None,
            archival_reason: None,
            pending_events: vec![EntityEvent {
                name: name.to_string(),
                kind: EntityEventKind::Created,
                source: ctx.event_source,
                timestamp: ctx.action_timestamp,
                data,
            }],
        }
    }

    /// Rebuilds a core from stored columns, rejecting states that break the
    /// lifecycle invariants.
    pub fn restore(
        ref_id: EntityId,
        created_time: Timestamp,
        last_modified_time: Timestamp,
        archived: bool,
        archived_time: Option<Timestamp>,
        archival_reason: Option<ArchivalReason>,
    ) -> DomainResult<Self> {
        if archived != archived_time.is_some() || archived != archival_reason.is_some() {
            return Err(DomainError::InvalidState(format!(
                "entity {ref_id}: archived={archived} but archived_time={archived_time:?}, archival_reason={archival_reason:?}"
            )));
        }
        if last_modified_time < created_time {
            return Err(DomainError::InvalidState(format!(
                "entity {ref_id}: last modified before it was created"
            )));
        }
        Ok(Self {
            ref_id,
            created_time,
            last_modified_time,
            archived,
            archived_time,
            archival_reason,
            pending_events: Vec::new(),
        })
    }

    pub fn ref_id(&self) -> EntityId {
        self.ref_id
    }

    pub fn created_time(&self) -> Timestamp {
        self.created_time
    }

    pub fn last_modified_time(&self) -> Timestamp {
        self.last_modified_time
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    pub fn archived_time(&self) -> Option<Timestamp> {
        self.archived_time
    }

    pub fn archival_reason(&self) -> Option<ArchivalReason> {
        self.archival_reason
    }

    pub fn pending_events(&self) -> &[EntityEvent] {
        &self.pending_events
    }

    pub(crate) fn assign_ref_id(&mut self, ref_id: EntityId) {
        self.ref_id = ref_id;
    }

    pub(crate) fn take_pending_events(&mut self) -> Vec<EntityEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Records an update, bumping `last_modified_time` monotonically.
    pub fn touch(&mut self, ctx: &DomainContext, name: &str, data: JsonValue) {
        let stamp = ctx.action_timestamp.max(self.last_modified_time);
        self.last_modified_time = stamp;
        self.pending_events.push(EntityEvent {
            name: name.to_string(),
            kind: EntityEventKind::Updated,
            source: ctx.event_source,
            timestamp: stamp,
            data,
        });
    }

    /// Archives the core. Returns `false` when it was already archived, in
    /// which case nothing changes.
    ///
    /// `archived_time` is always the context's timestamp, so one cascade
    /// shares it; only `last_modified_time` is kept monotonic.
    pub fn archive(&mut self, ctx: &DomainContext, reason: ArchivalReason) -> bool {
        if self.archived {
            return false;
        }
        self.archived = true;
        self.archived_time = Some(ctx.action_timestamp);
        self.archival_reason = Some(reason);
        self.last_modified_time = ctx.action_timestamp.max(self.last_modified_time);
        self.pending_events.push(EntityEvent {
            name: "mark_archived".to_string(),
            kind: EntityEventKind::Archived,
            source: ctx.event_source,
            timestamp: ctx.action_timestamp,
            data: serde_json::json!({ "archival_reason": reason }),
        });
        true
    }
}

/// Behaviour shared by every entity shape.
pub trait Entity: Clone + fmt::Debug {
    const KIND: EntityKind;

    fn core(&self) -> &EntityCore;

    fn core_mut(&mut self) -> &mut EntityCore;

    /// The owning parent, `None` for roots.
    fn parent(&self) -> Option<ParentLink> {
        None
    }

    fn ref_id(&self) -> EntityId {
        self.core().ref_id()
    }

    fn is_archived(&self) -> bool {
        self.core().archived()
    }

    /// Fails when the entity is archived; mutators call this first.
    fn ensure_live(&self) -> DomainResult<()> {
        if self.is_archived() {
            return Err(DomainError::EntityArchived {
                kind: Self::KIND,
                ref_id: self.ref_id(),
            });
        }
        Ok(())
    }

    /// A link children can use to point here. Only live, saved entities hand one out.
    fn live_link(&self) -> DomainResult<ParentLink> {
        self.ensure_live()?;
        if self.ref_id().is_new() {
            return Err(DomainError::EntityNotSaved {
                kind: Self::KIND,
                ref_id: self.ref_id(),
            });
        }
        Ok(ParentLink::new(Self::KIND, self.ref_id()))
    }

    /// Idempotent archival. Returns whether anything changed.
    fn mark_archived(&mut self, ctx: &DomainContext, reason: ArchivalReason) -> bool {
        self.core_mut().archive(ctx, reason)
    }
}

/// Entities without a parent (users, workspaces).
pub trait RootEntity: Entity {}

/// Singleton-per-tenant entities addressed through their owner.
pub trait StubEntity: Entity {
    fn owner(&self) -> ParentLink;
}

/// Singleton collections hanging off a root.
pub trait TrunkEntity: Entity {
    fn parent_link(&self) -> ParentLink;
}

/// Entities with a trunk parent that own leaves.
pub trait BranchEntity: Entity {
    fn parent_link(&self) -> ParentLink;
}

/// Entities with a trunk or branch parent.
pub trait LeafEntity: Entity {
    fn parent_link(&self) -> ParentLink;

    fn parent_link_mut(&mut self) -> &mut ParentLink;

    /// Moves the leaf under another parent of the same kind.
    ///
    /// Both links must come from live entities (see [`Entity::live_link`]) and
    /// `current` must be the leaf's present parent.
    fn change_parent(
        &mut self,
        ctx: &DomainContext,
        current: ParentLink,
        new_parent: ParentLink,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        let existing = self.parent_link();
        if current != existing {
            return Err(DomainError::InvalidState(format!(
                "{} {} is not a child of {current}",
                Self::KIND,
                self.ref_id()
            )));
        }
        let new_parent = new_parent.expect_kind(existing.kind())?;
        if new_parent == existing {
            return Ok(());
        }
        *self.parent_link_mut() = new_parent;
        self.core_mut().touch(
            ctx,
            "change_parent",
            serde_json::json!({ "from": existing.ref_id(), "to": new_parent.ref_id() }),
        );
        Ok(())
    }
}

/// Rejects a user change to a field when the entity's source forbids it.
pub fn ensure_user_changes<S: SourceDiscriminator>(
    kind: EntityKind,
    ref_id: EntityId,
    source: S,
    field: &'static str,
) -> DomainResult<()> {
    if !source.allow_user_changes() {
        return Err(DomainError::ImmutableSource {
            kind,
            ref_id,
            source_name: source.to_string(),
            field,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_at(raw: &str) -> DomainContext {
        DomainContext::new(EventSource::Cli, Timestamp::from_raw(raw).unwrap())
    }

    #[test]
    fn new_core_is_live_with_a_creation_event() {
        let core = EntityCore::new_live(&ctx_at("2024-01-01T00:00:00Z"), "new_thing", JsonValue::Null);
        assert!(!core.archived());
        assert!(core.archived_time().is_none() && core.archival_reason().is_none());
        assert_eq!(core.created_time(), core.last_modified_time());
        assert_eq!(core.pending_events()[0].kind, EntityEventKind::Created);
    }

    #[test]
    fn archive_is_idempotent_and_keeps_the_first_reason() {
        let mut core = EntityCore::new_live(&ctx_at("2024-01-01T00:00:00Z"), "new_thing", JsonValue::Null);
        assert!(core.archive(&ctx_at("2024-01-02T00:00:00Z"), ArchivalReason::User));
        let snapshot = core.clone();
        assert!(!core.archive(&ctx_at("2024-01-03T00:00:00Z"), ArchivalReason::User));
        assert!(!core.archive(&ctx_at("2024-01-03T00:00:00Z"), ArchivalReason::Gc));
        assert_eq!(core, snapshot);
        assert_eq!(core.archival_reason(), Some(ArchivalReason::User));
    }

    #[test]
    fn touch_never_moves_last_modified_backwards() {
        let mut core = EntityCore::new_live(&ctx_at("2024-01-05T00:00:00Z"), "new_thing", JsonValue::Null);
        core.touch(&ctx_at("2024-01-01T00:00:00Z"), "update", JsonValue::Null);
        assert_eq!(core.last_modified_time(), core.created_time());
    }

    #[test]
    fn archive_stamps_the_context_time_even_behind_last_modified() {
        let mut core = EntityCore::new_live(&ctx_at("2024-01-05T00:00:00Z"), "new_thing", JsonValue::Null);
        let ctx = ctx_at("2024-01-01T00:00:00Z");
        assert!(core.archive(&ctx, ArchivalReason::Gc));
        assert_eq!(core.archived_time(), Some(ctx.action_timestamp));
        assert_eq!(core.last_modified_time(), core.created_time());
    }

    #[test]
    fn restore_rejects_half_archived_rows() {
        let ts = Timestamp::from_raw("2024-01-01T00:00:00Z").unwrap();
        assert!(EntityCore::restore(EntityId::from_i64(1), ts, ts, true, Some(ts), None).is_err());
        assert!(EntityCore::restore(EntityId::from_i64(1), ts, ts, false, Some(ts), None).is_err());
        assert!(EntityCore::restore(EntityId::from_i64(1), ts, ts, true, Some(ts), Some(ArchivalReason::Gc)).is_ok());
    }
}

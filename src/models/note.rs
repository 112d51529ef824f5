use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{EntityKind, NoteDomain, NoteSource};
use super::values::{EntityId, EntityName, InputValidationError};

/// Free-form text, either standalone or attached to another entity.
///
/// A note with a non-user `source` is the single note owned by
/// `(source, source_entity_ref_id)`; the store keeps that pair unique across
/// live and archived notes. User notes may point at any entity, any number of
/// times.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub(crate) core: EntityCore,
    pub(crate) note_collection: ParentLink,
    pub(crate) domain: NoteDomain,
    pub(crate) source: NoteSource,
    pub(crate) source_entity_ref_id: Option<EntityId>,
    pub(crate) name: EntityName,
    pub(crate) content: String,
}

impl Note {
    pub fn new_note(
        ctx: &DomainContext,
        note_collection: ParentLink,
        domain: NoteDomain,
        source: NoteSource,
        source_entity_ref_id: Option<EntityId>,
        name: EntityName,
        content: String,
    ) -> DomainResult<Self> {
        let note_collection = note_collection.expect_kind(EntityKind::NoteCollection)?;
        if let Some(bound) = source.domain() {
            if bound != domain {
                return Err(InputValidationError::new(format!(
                    "a note with source `{source}` must use domain `{bound}`, not `{domain}`"
                ))
                .into());
            }
            if source_entity_ref_id.is_none() {
                return Err(InputValidationError::new(format!(
                    "a note with source `{source}` needs the entity it is attached to"
                ))
                .into());
            }
        }
        let core = EntityCore::new_live(
            ctx,
            "new_note",
            json!({
                "domain": domain,
                "source": source,
                "source_entity_ref_id": source_entity_ref_id,
                "name": name,
            }),
        );
        Ok(Self {
            core,
            note_collection,
            domain,
            source,
            source_entity_ref_id,
            name,
            content,
        })
    }

    pub fn domain(&self) -> NoteDomain {
        self.domain
    }

    pub fn source(&self) -> NoteSource {
        self.source
    }

    pub fn source_entity_ref_id(&self) -> Option<EntityId> {
        self.source_entity_ref_id
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn update(
        &mut self,
        ctx: &DomainContext,
        name: EntityName,
        content: String,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(ctx, "update", json!({ "name": name }));
        self.name = name;
        self.content = content;
        Ok(())
    }
}

impl Entity for Note {
    const KIND: EntityKind = EntityKind::Note;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.note_collection)
    }
}

impl LeafEntity for Note {
    fn parent_link(&self) -> ParentLink {
        self.note_collection
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.note_collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::EventSource;

    fn collection() -> ParentLink {
        ParentLink::new(EntityKind::NoteCollection, EntityId::from_i64(1))
    }

    #[test]
    fn sourced_notes_must_match_their_domain_and_target() {
        let ctx = DomainContext::now(EventSource::Cli);
        let name = EntityName::from_raw("Reading").unwrap();
        assert!(Note::new_note(
            &ctx,
            collection(),
            NoteDomain::Person,
            NoteSource::MetricEntry,
            Some(EntityId::from_i64(5)),
            name.clone(),
            String::new(),
        )
        .is_err());
        assert!(Note::new_note(
            &ctx,
            collection(),
            NoteDomain::MetricEntry,
            NoteSource::MetricEntry,
            None,
            name.clone(),
            String::new(),
        )
        .is_err());
        assert!(Note::new_note(
            &ctx,
            collection(),
            NoteDomain::MetricEntry,
            NoteSource::MetricEntry,
            Some(EntityId::from_i64(5)),
            name,
            String::new(),
        )
        .is_ok());
    }
}

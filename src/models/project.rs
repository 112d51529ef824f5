use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::EntityKind;
use super::values::{EntityKey, EntityName};

/// A project groups habits, big plans and inbox tasks.
///
/// Projects are leaves of the workspace's `ProjectCollection`. Their `key` is
/// unique among the live projects of a collection, so it can be used as a
/// short handle on the command line.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub(crate) core: EntityCore,
    pub(crate) project_collection: ParentLink,
    pub(crate) key: EntityKey,
    pub(crate) name: EntityName,
}

impl Project {
    pub fn new_project(
        ctx: &DomainContext,
        project_collection: ParentLink,
        key: EntityKey,
        name: EntityName,
    ) -> DomainResult<Self> {
        let project_collection = project_collection.expect_kind(EntityKind::ProjectCollection)?;
        let core = EntityCore::new_live(ctx, "new_project", json!({ "key": key, "name": name }));
        Ok(Self {
            core,
            project_collection,
            key,
            name,
        })
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn update_name(&mut self, ctx: &DomainContext, name: EntityName) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(ctx, "update_name", json!({ "name": name }));
        self.name = name;
        Ok(())
    }
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.project_collection)
    }
}

impl LeafEntity for Project {
    fn parent_link(&self) -> ParentLink {
        self.project_collection
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.project_collection
    }
}

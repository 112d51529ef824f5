use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::EntityKind;
use super::values::{EntityKey, EntityName};

/// A named checklist. Branch under the workspace's smart list collection.
#[derive(Debug, Clone, Serialize)]
pub struct SmartList {
    pub(crate) core: EntityCore,
    pub(crate) smart_list_collection: ParentLink,
    pub(crate) key: EntityKey,
    pub(crate) name: EntityName,
}

impl SmartList {
    pub fn new_smart_list(
        ctx: &DomainContext,
        smart_list_collection: ParentLink,
        key: EntityKey,
        name: EntityName,
    ) -> DomainResult<Self> {
        let smart_list_collection =
            smart_list_collection.expect_kind(EntityKind::SmartListCollection)?;
        let core = EntityCore::new_live(ctx, "new_smart_list", json!({ "key": key, "name": name }));
        Ok(Self {
            core,
            smart_list_collection,
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

impl Entity for SmartList {
    const KIND: EntityKind = EntityKind::SmartList;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.smart_list_collection)
    }
}

impl BranchEntity for SmartList {
    fn parent_link(&self) -> ParentLink {
        self.smart_list_collection
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SmartListItem {
    pub(crate) core: EntityCore,
    pub(crate) smart_list: ParentLink,
    pub(crate) name: EntityName,
    pub(crate) is_done: bool,
}

impl SmartListItem {
    pub fn new_smart_list_item(
        ctx: &DomainContext,
        smart_list: ParentLink,
        name: EntityName,
    ) -> DomainResult<Self> {
        let smart_list = smart_list.expect_kind(EntityKind::SmartList)?;
        let core = EntityCore::new_live(ctx, "new_smart_list_item", json!({ "name": name }));
        Ok(Self {
            core,
            smart_list,
            name,
            is_done: false,
        })
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn is_done(&self) -> bool {
        self.is_done
    }

    pub fn set_done(&mut self, ctx: &DomainContext, is_done: bool) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(ctx, "set_done", json!({ "is_done": is_done }));
        self.is_done = is_done;
        Ok(())
    }
}

impl Entity for SmartListItem {
    const KIND: EntityKind = EntityKind::SmartListItem;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.smart_list)
    }
}

impl LeafEntity for SmartListItem {
    fn parent_link(&self) -> ParentLink {
        self.smart_list
    }

    fn parent_link_mut(&mut self) -> &mut ParentLink {
        &mut self.smart_list
    }
}

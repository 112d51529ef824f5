use super::contract::*;
use super::error::UseCaseResult;
use crate::db::{
    BranchEntityRepository, LeafEntityRepository, Repositories, TrunkEntityRepository, UnitOfWork,
};
use crate::models::*;

#[derive(Debug, Clone)]
pub struct CreateSmartListArgs {
    pub key: EntityKey,
    pub name: EntityName,
}

pub struct CreateSmartList;

impl UseCase for CreateSmartList {
    const NAME: &'static str = "smart-list-create";
    type Args = CreateSmartListArgs;
    type Output = SmartList;
}

impl LoggedInMutationUseCase for CreateSmartList {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateSmartListArgs,
    ) -> UseCaseResult<SmartList> {
        session.require(WorkspaceFeature::SmartLists)?;
        let collection = uow
            .repository::<SmartListCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let list =
            SmartList::new_smart_list(ctx, collection.live_link()?, args.key, args.name)?;
        Ok(uow.repository::<SmartList>().create(list)?)
    }
}

#[derive(Debug, Clone)]
pub struct CreateSmartListItemArgs {
    pub smart_list_ref_id: EntityId,
    pub name: EntityName,
}

pub struct CreateSmartListItem;

impl UseCase for CreateSmartListItem {
    const NAME: &'static str = "smart-list-item-create";
    type Args = CreateSmartListItemArgs;
    type Output = SmartListItem;
}

impl LoggedInMutationUseCase for CreateSmartListItem {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateSmartListItemArgs,
    ) -> UseCaseResult<SmartListItem> {
        session.require(WorkspaceFeature::SmartLists)?;
        let list = uow
            .repository::<SmartList>()
            .load_by_id(args.smart_list_ref_id, false)?;
        let item = SmartListItem::new_smart_list_item(ctx, list.live_link()?, args.name)?;
        Ok(uow.repository::<SmartListItem>().create(item)?)
    }
}

use super::contract::*;
use super::error::{UseCaseError, UseCaseResult};
use crate::db::{LeafEntityRepository, Repositories, TrunkEntityRepository, UnitOfWork};
use crate::models::*;

#[derive(Debug, Clone)]
pub struct CreateNoteArgs {
    pub domain: NoteDomain,
    pub source: NoteSource,
    pub source_entity_ref_id: Option<EntityId>,
    pub name: EntityName,
    pub content: String,
}

/// Creates a standalone or attached note. Notes attached to inbox tasks must
/// point at a live one.
pub struct CreateNote;

impl UseCase for CreateNote {
    const NAME: &'static str = "note-create";
    type Args = CreateNoteArgs;
    type Output = Note;
}

impl LoggedInMutationUseCase for CreateNote {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: CreateNoteArgs,
    ) -> UseCaseResult<Note> {
        session.require(WorkspaceFeature::Notes)?;
        if args.domain == NoteDomain::InboxTask {
            let ref_id = args.source_entity_ref_id.ok_or_else(|| {
                UseCaseError::Validation("an inbox task note needs the task it is attached to".into())
            })?;
            uow.repository::<InboxTask>().load_by_id(ref_id, false)?;
        }
        let collection = uow
            .repository::<NoteCollection>()
            .load_by_parent(session.workspace_ref_id())?;
        let note = Note::new_note(
            ctx,
            collection.live_link()?,
            args.domain,
            args.source,
            args.source_entity_ref_id,
            args.name,
            args.content,
        )?;
        Ok(uow.repository::<Note>().create(note)?)
    }
}

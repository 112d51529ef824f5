//! Workspace bring-up, login and workspace-wide settings.

use serde::Serialize;

use super::contract::*;
use super::error::{UseCaseError, UseCaseResult};
use crate::bootstrap::WorkspaceFile;
use crate::db::{
    ReadView, Repositories, RootEntityRepository, StubEntityRepository, TrunkEntityRepository,
    UnitOfWork, UserRepository,
};
use crate::models::*;
use crate::services::upsert_after_commit;

// ============================================================
// Init
// ============================================================

#[derive(Debug, Clone)]
pub struct InitWorkspaceArgs {
    pub user_email: EmailAddress,
    pub user_name: EntityName,
    pub password: String,
    pub workspace_name: EntityName,
    pub feature_flags: FeatureFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitWorkspaceOutput {
    pub user: User,
    pub workspace: Workspace,
}

/// Creates the owner, their credentials, the workspace and all of its trunks.
pub struct InitWorkspace;

impl UseCase for InitWorkspace {
    const NAME: &'static str = "init-workspace";
    type Args = InitWorkspaceArgs;
    type Output = InitWorkspaceOutput;
}

impl MutationUseCase for InitWorkspace {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        args: InitWorkspaceArgs,
    ) -> UseCaseResult<InitWorkspaceOutput> {
        if !uow.repository::<Workspace>().find_all(false)?.is_empty() {
            return Err(UseCaseError::Conflict(
                "a workspace is already initialised in this database".into(),
            ));
        }
        let password_hash = PasswordHash::from_plain(&args.password)?;

        let user = uow
            .repository::<User>()
            .create(User::new_user(ctx, args.user_email, args.user_name))?;
        uow.repository::<Auth>()
            .create(Auth::new_auth(ctx, user.live_link()?, password_hash)?)?;
        let workspace = uow.repository::<Workspace>().create(Workspace::new_workspace(
            ctx,
            &user,
            args.workspace_name,
            args.feature_flags,
        )?)?;

        let ws = workspace.live_link()?;
        uow.repository::<ProjectCollection>()
            .create(ProjectCollection::new(ctx, ws)?)?;
        uow.repository::<HabitCollection>()
            .create(HabitCollection::new(ctx, ws)?)?;
        uow.repository::<InboxTaskCollection>()
            .create(InboxTaskCollection::new(ctx, ws)?)?;
        uow.repository::<BigPlanCollection>()
            .create(BigPlanCollection::new(ctx, ws)?)?;
        uow.repository::<JournalCollection>()
            .create(JournalCollection::new(ctx, ws)?)?;
        uow.repository::<NoteCollection>()
            .create(NoteCollection::new(ctx, ws)?)?;
        uow.repository::<SmartListCollection>()
            .create(SmartListCollection::new(ctx, ws)?)?;
        uow.repository::<TimePlanDomain>()
            .create(TimePlanDomain::new(ctx, ws)?)?;
        uow.repository::<ScheduleDomain>()
            .create(ScheduleDomain::new(ctx, ws)?)?;
        uow.repository::<GcLog>().create(GcLog::new(ctx, ws)?)?;

        tracing::info!(workspace = %workspace.ref_id(), user = %user.ref_id(), "Workspace initialised");
        Ok(InitWorkspaceOutput { user, workspace })
    }

    fn after_commit(&self, env: &UseCaseEnv, output: &InitWorkspaceOutput) -> UseCaseResult<()> {
        upsert_after_commit(env.crm.as_ref(), output.user.email_address(), output.user.name());

        let existing = match env.files.load_workspace() {
            Ok(existing) => existing.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable workspace file");
                WorkspaceFile::default()
            }
        };
        let file = WorkspaceFile {
            name: output.workspace.name().to_string(),
            space_id: Some(output.workspace.ref_id().to_string()),
            ..existing
        };
        if let Err(e) = env.files.save_workspace(&file) {
            tracing::warn!(error = %e, "Cannot write workspace file");
        }
        Ok(())
    }
}

// ============================================================
// Login
// ============================================================

#[derive(Debug, Clone)]
pub struct LoginArgs {
    pub email_address: EmailAddress,
    pub password: String,
}

/// Checks credentials, then records the principal in `.system.lock`.
pub struct Login;

impl UseCase for Login {
    const NAME: &'static str = "login";
    type Args = LoginArgs;
    type Output = Principal;
}

impl ReadonlyUseCase for Login {
    fn execute(&self, view: &ReadView<'_>, args: LoginArgs) -> UseCaseResult<Principal> {
        let denied = || UseCaseError::AuthDenied("invalid email address or password".into());
        let user = view
            .repository::<User>()
            .load_by_email_address(&args.email_address)?
            .ok_or_else(denied)?;
        let auth = view.repository::<Auth>().load_by_owner(user.ref_id())?;
        if !auth.check_password(&args.password) {
            return Err(denied());
        }
        let workspace = view
            .repository::<Workspace>()
            .find_all(false)?
            .into_iter()
            .find(|w| w.owner_user_ref_id() == user.ref_id())
            .ok_or_else(|| UseCaseError::NotFound("no workspace, run `lifeplan init`".into()))?;

        Ok(Principal {
            user_ref_id: user.ref_id(),
            workspace_ref_id: workspace.ref_id(),
            expires_at: Timestamp::now().plus(session_lifetime()),
        })
    }

    fn after_read(&self, env: &UseCaseEnv, principal: &Principal) -> UseCaseResult<()> {
        let mut lock = env.files.load_lock();
        principal.write_to(&mut lock);
        env.files.save_lock(&lock)?;
        tracing::info!(user = %principal.user_ref_id, "Logged in");
        Ok(())
    }
}

// ============================================================
// Credentials and settings
// ============================================================

#[derive(Debug, Clone)]
pub struct ChangePasswordArgs {
    pub current_password: String,
    pub new_password: String,
}

pub struct ChangePassword;

impl UseCase for ChangePassword {
    const NAME: &'static str = "change-password";
    type Args = ChangePasswordArgs;
    type Output = ();
}

impl LoggedInMutationUseCase for ChangePassword {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: ChangePasswordArgs,
    ) -> UseCaseResult<()> {
        let repository = uow.repository::<Auth>();
        let mut auth = repository.load_by_owner(session.user.ref_id())?;
        if !auth.check_password(&args.current_password) {
            return Err(UseCaseError::AuthDenied("current password does not match".into()));
        }
        auth.change_password(ctx, PasswordHash::from_plain(&args.new_password)?)?;
        repository.save(auth)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UpdateFeatureFlagsArgs {
    pub changes: Vec<(WorkspaceFeature, bool)>,
}

pub struct UpdateFeatureFlags;

impl UseCase for UpdateFeatureFlags {
    const NAME: &'static str = "update-feature-flags";
    type Args = UpdateFeatureFlagsArgs;
    type Output = FeatureFlags;
}

impl LoggedInMutationUseCase for UpdateFeatureFlags {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: UpdateFeatureFlagsArgs,
    ) -> UseCaseResult<FeatureFlags> {
        let mut workspace = session.workspace.clone();
        let flags = args
            .changes
            .into_iter()
            .fold(workspace.feature_flags().clone(), |flags, (feature, enabled)| {
                flags.with(feature, enabled)
            });
        workspace.update_feature_flags(ctx, flags)?;
        let workspace = uow.repository::<Workspace>().save(workspace)?;
        Ok(workspace.feature_flags().clone())
    }
}

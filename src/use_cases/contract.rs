use std::sync::Arc;

use crate::bootstrap::{BootstrapFiles, SystemLock};
use crate::db::{
    Cancellation, DomainStorageEngine, ReadView, Repositories, RootEntityRepository, StoreError,
    UnitOfWork,
};
use crate::models::*;
use crate::services::{CrmGateway, NoOpCrm};

use super::error::{UseCaseError, UseCaseResult};

/// How long a login stays valid.
pub fn session_lifetime() -> chrono::Duration {
    chrono::Duration::days(30)
}

/// Who is logged in, as recorded in `.system.lock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Principal {
    pub user_ref_id: EntityId,
    pub workspace_ref_id: EntityId,
    pub expires_at: Timestamp,
}

impl Principal {
    /// `None` unless the lock holds a complete, well-formed principal.
    pub fn from_lock(lock: &SystemLock) -> Option<Self> {
        let expires_at = Timestamp::from_raw(lock.expires_at.as_deref()?).ok()?;
        Some(Self {
            user_ref_id: EntityId::from_i64(lock.user_ref_id?),
            workspace_ref_id: EntityId::from_i64(lock.workspace_ref_id?),
            expires_at,
        })
    }

    pub fn write_to(&self, lock: &mut SystemLock) {
        lock.user_ref_id = Some(self.user_ref_id.as_i64());
        lock.workspace_ref_id = Some(self.workspace_ref_id.as_i64());
        lock.expires_at = Some(self.expires_at.as_raw());
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// The principal resolved against the store.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub workspace: Workspace,
}

impl Session {
    pub fn workspace_ref_id(&self) -> EntityId {
        self.workspace.ref_id()
    }

    pub fn require(&self, feature: WorkspaceFeature) -> UseCaseResult<()> {
        Ok(self.workspace.check_feature(feature)?)
    }

    fn load<R: Repositories>(repos: &R, principal: &Principal) -> UseCaseResult<Self> {
        let denied = |e: StoreError| -> UseCaseError {
            if e.is_not_found() {
                UseCaseError::AuthDenied("the session refers to an unknown user or workspace".into())
            } else {
                e.into()
            }
        };
        let user = repos
            .repository::<User>()
            .load_by_id(principal.user_ref_id, false)
            .map_err(denied)?;
        let workspace = repos
            .repository::<Workspace>()
            .load_by_id(principal.workspace_ref_id, false)
            .map_err(denied)?;
        if workspace.owner_user_ref_id() != user.ref_id() {
            return Err(UseCaseError::AuthDenied(format!(
                "user {} does not own workspace {}",
                user.ref_id(),
                workspace.ref_id()
            )));
        }
        Ok(Self { user, workspace })
    }
}

/// A named operation with typed arguments and output.
pub trait UseCase {
    const NAME: &'static str;
    type Args;
    type Output;
}

/// Runs inside one unit of work; commits only when it succeeds.
pub trait MutationUseCase: UseCase {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        args: Self::Args,
    ) -> UseCaseResult<Self::Output>;

    /// Side effects outside the store. Runs after commit; only critical
    /// effects return an error, the rest log and carry on.
    fn after_commit(&self, _env: &UseCaseEnv, _output: &Self::Output) -> UseCaseResult<()> {
        Ok(())
    }
}

/// Reads without a unit of work.
pub trait ReadonlyUseCase: UseCase {
    fn execute(&self, view: &ReadView<'_>, args: Self::Args) -> UseCaseResult<Self::Output>;

    fn after_read(&self, _env: &UseCaseEnv, _output: &Self::Output) -> UseCaseResult<()> {
        Ok(())
    }
}

pub trait LoggedInMutationUseCase: UseCase {
    fn execute(
        &self,
        uow: &UnitOfWork<'_>,
        ctx: &DomainContext,
        session: &Session,
        args: Self::Args,
    ) -> UseCaseResult<Self::Output>;

    fn after_commit(
        &self,
        _env: &UseCaseEnv,
        _session: &Session,
        _output: &Self::Output,
    ) -> UseCaseResult<()> {
        Ok(())
    }
}

pub trait LoggedInReadonlyUseCase: UseCase {
    fn execute(
        &self,
        view: &ReadView<'_>,
        session: &Session,
        args: Self::Args,
    ) -> UseCaseResult<Self::Output>;
}

/// A logged-in mutation that opens its own units of work, one per batch.
pub trait LoggedInBatchUseCase: UseCase {
    fn execute(
        &self,
        env: &UseCaseEnv,
        ctx: &DomainContext,
        session: &Session,
        args: Self::Args,
    ) -> UseCaseResult<Self::Output>;
}

/// Everything a use case may touch, and the runners that enforce the contract.
#[derive(Clone)]
pub struct UseCaseEnv {
    pub storage: DomainStorageEngine,
    pub files: BootstrapFiles,
    pub crm: Arc<dyn CrmGateway>,
    pub principal: Option<Principal>,
    pub event_source: EventSource,
    pub cancellation: Cancellation,
}

impl UseCaseEnv {
    pub fn new(storage: DomainStorageEngine, files: BootstrapFiles) -> Self {
        Self {
            storage,
            files,
            crm: Arc::new(NoOpCrm),
            principal: None,
            event_source: EventSource::Cli,
            cancellation: Cancellation::default(),
        }
    }

    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_crm(mut self, crm: Arc<dyn CrmGateway>) -> Self {
        self.crm = crm;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    fn context(&self) -> DomainContext {
        DomainContext::now(self.event_source)
    }

    fn require_principal(&self, ctx: &DomainContext) -> UseCaseResult<Principal> {
        let principal = self.principal.ok_or_else(|| {
            UseCaseError::AuthRequired("no session, run `lifeplan login` first".into())
        })?;
        if principal.is_expired(ctx.action_timestamp) {
            return Err(UseCaseError::AuthRequired(format!(
                "session expired at {}",
                principal.expires_at
            )));
        }
        Ok(principal)
    }

    pub fn run_mutation<U: MutationUseCase>(
        &self,
        use_case: &U,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let _span = tracing::info_span!("use_case", name = U::NAME).entered();
        let ctx = self.context();
        let output = self
            .storage
            .unit_of_work_with(&self.cancellation, |uow| use_case.execute(uow, &ctx, args))
            .inspect_err(|e| tracing::info!(error = %e, "Use case failed"))?;
        tracing::debug!("Committed");
        use_case.after_commit(self, &output)?;
        Ok(output)
    }

    pub fn run_readonly<U: ReadonlyUseCase>(
        &self,
        use_case: &U,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let _span = tracing::info_span!("use_case", name = U::NAME).entered();
        let output = self
            .storage
            .read_view(|view| use_case.execute(view, args))
            .inspect_err(|e| tracing::info!(error = %e, "Use case failed"))?;
        use_case.after_read(self, &output)?;
        Ok(output)
    }

    pub fn run_logged_in_mutation<U: LoggedInMutationUseCase>(
        &self,
        use_case: &U,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let _span = tracing::info_span!("use_case", name = U::NAME).entered();
        let ctx = self.context();
        let principal = self.require_principal(&ctx)?;
        let (session, output) = self
            .storage
            .unit_of_work_with(&self.cancellation, |uow| {
                let session = Session::load(uow, &principal)?;
                let output = use_case.execute(uow, &ctx, &session, args)?;
                Ok::<_, UseCaseError>((session, output))
            })
            .inspect_err(|e| tracing::info!(error = %e, "Use case failed"))?;
        tracing::debug!("Committed");
        use_case.after_commit(self, &session, &output)?;
        Ok(output)
    }

    pub fn run_logged_in_readonly<U: LoggedInReadonlyUseCase>(
        &self,
        use_case: &U,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let _span = tracing::info_span!("use_case", name = U::NAME).entered();
        let principal = self.require_principal(&self.context())?;
        self.storage
            .read_view(|view| {
                let session = Session::load(view, &principal)?;
                use_case.execute(view, &session, args)
            })
            .inspect_err(|e| tracing::info!(error = %e, "Use case failed"))
    }

    pub fn run_logged_in_batch<U: LoggedInBatchUseCase>(
        &self,
        use_case: &U,
        args: U::Args,
    ) -> UseCaseResult<U::Output> {
        let _span = tracing::info_span!("use_case", name = U::NAME).entered();
        let ctx = self.context();
        let principal = self.require_principal(&ctx)?;
        let session = self
            .storage
            .read_view(|view| Session::load(view, &principal))?;
        use_case
            .execute(self, &ctx, &session, args)
            .inspect_err(|e| tracing::info!(error = %e, "Use case failed"))
    }
}

use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;

use crate::bootstrap::BootstrapError;
use crate::db::{ConnectionPrepareError, StoreError};
use crate::models::{DomainError, InputValidationError, RecurringTaskPeriod, Timeline, WorkspaceFeature};

/// The error kinds a caller of a use case can observe.
#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid input: {}", format_fields(.0))]
    MultiValidation(BTreeMap<String, String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("a {period} journal for {timeline} already exists")]
    JournalExists {
        period: RecurringTaskPeriod,
        timeline: Timeline,
    },

    #[error("not logged in: {0}")]
    AuthRequired(String),

    #[error("access denied: {0}")]
    AuthDenied(String),

    #[error("{0}")]
    ImmutableSource(String),

    #[error("feature `{0}` is not enabled for this workspace")]
    FeatureUnavailable(WorkspaceFeature),

    #[error("storage could not be prepared: {0}")]
    StoragePrepare(String),

    #[error("operation timed out")]
    Timeout,

    /// Details are logged under `incident`; only the id reaches the caller.
    #[error("internal error (incident {incident})")]
    Internal { incident: Uuid },
}

pub type UseCaseResult<T> = Result<T, UseCaseError>;

fn format_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl UseCaseError {
    /// Logs `error` with a fresh incident id and returns the opaque error.
    pub fn internal(error: impl std::fmt::Display) -> Self {
        let incident = Uuid::new_v4();
        tracing::error!(%incident, error = %error, "Internal error");
        Self::Internal { incident }
    }

    /// Collects per-field validation results; `Ok` only when every field passed.
    pub fn check_fields(
        results: impl IntoIterator<Item = (&'static str, Result<(), InputValidationError>)>,
    ) -> UseCaseResult<()> {
        let errors: BTreeMap<String, String> = results
            .into_iter()
            .filter_map(|(field, result)| result.err().map(|e| (field.to_string(), e.to_string())))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::MultiValidation(errors))
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_)
            | Self::MultiValidation(_)
            | Self::ImmutableSource(_)
            | Self::FeatureUnavailable(_) => 1,
            Self::AuthRequired(_) | Self::AuthDenied(_) => 2,
            Self::NotFound(_) => 3,
            Self::Conflict(_) | Self::JournalExists { .. } => 4,
            Self::StoragePrepare(_) | Self::Timeout | Self::Internal { .. } => 5,
        }
    }
}

impl From<InputValidationError> for UseCaseError {
    fn from(e: InputValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<DomainError> for UseCaseError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(e) => Self::Validation(e.to_string()),
            DomainError::ImmutableSource { .. } => Self::ImmutableSource(e.to_string()),
            DomainError::EntityArchived { .. } => Self::NotFound(e.to_string()),
            DomainError::IncompatibleParent { .. } | DomainError::InvalidState(_) => {
                Self::Validation(e.to_string())
            }
            DomainError::FeatureUnavailable(feature) => Self::FeatureUnavailable(feature),
            DomainError::EntityNotSaved { .. } => Self::internal(e),
        }
    }
}

impl From<StoreError> for UseCaseError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Domain(e) => e.into(),
            StoreError::JournalExistsForPeriodAndDate { period, timeline } => {
                Self::JournalExists { period, timeline }
            }
            StoreError::EntityAlreadyExists { .. } => Self::Conflict(e.to_string()),
            StoreError::EntityNotFound { .. }
            | StoreError::TrunkNotFound { .. }
            | StoreError::NotFoundBy { .. }
            | StoreError::ParentNotFound { .. }
            | StoreError::ParentArchived { .. } => Self::NotFound(e.to_string()),
            StoreError::Cancelled => Self::Timeout,
            StoreError::AlreadyCreated { .. } | StoreError::Corrupt { .. } | StoreError::Sqlite(_) => {
                Self::internal(e)
            }
        }
    }
}

impl From<ConnectionPrepareError> for UseCaseError {
    fn from(e: ConnectionPrepareError) -> Self {
        tracing::error!(error = %e, "Storage prepare failed");
        Self::StoragePrepare(e.to_string())
    }
}

impl From<BootstrapError> for UseCaseError {
    fn from(e: BootstrapError) -> Self {
        Self::internal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, EntityKind};

    #[test]
    fn exit_codes_follow_error_kinds() {
        assert_eq!(UseCaseError::Validation("x".into()).exit_code(), 1);
        assert_eq!(UseCaseError::AuthRequired("x".into()).exit_code(), 2);
        assert_eq!(UseCaseError::NotFound("x".into()).exit_code(), 3);
        assert_eq!(UseCaseError::Conflict("x".into()).exit_code(), 4);
        assert_eq!(UseCaseError::Timeout.exit_code(), 5);
    }

    #[test]
    fn archived_entities_surface_as_not_found() {
        let err: UseCaseError = StoreError::Domain(DomainError::EntityArchived {
            kind: EntityKind::Project,
            ref_id: EntityId::from_i64(3),
        })
        .into();
        assert!(matches!(err, UseCaseError::NotFound(_)));
    }

    #[test]
    fn field_errors_are_collected() {
        let err = UseCaseError::check_fields([
            ("name", Err(InputValidationError::new("empty"))),
            ("key", Ok(())),
            ("email", Err(InputValidationError::new("no @"))),
        ])
        .unwrap_err();
        match err {
            UseCaseError::MultiValidation(fields) => {
                assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["email", "name"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

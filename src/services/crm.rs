//! Post-commit customer-relationship hook.

use crate::models::{EmailAddress, EntityName};

#[derive(Debug, thiserror::Error)]
#[error("crm upsert failed: {0}")]
pub struct CrmError(pub String);

/// Best-effort side effect run after a user-facing mutation commits.
pub trait CrmGateway: Send + Sync {
    fn upsert_as_user(&self, email_address: &EmailAddress, name: &EntityName) -> Result<(), CrmError>;
}

/// The default gateway. Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCrm;

impl CrmGateway for NoOpCrm {
    fn upsert_as_user(&self, _: &EmailAddress, _: &EntityName) -> Result<(), CrmError> {
        Ok(())
    }
}

/// Runs the upsert, logging failures instead of returning them.
pub fn upsert_after_commit(crm: &dyn CrmGateway, email_address: &EmailAddress, name: &EntityName) {
    if let Err(e) = crm.upsert_as_user(email_address, name) {
        tracing::warn!(error = %e, email = %email_address, "CRM upsert failed");
    }
}

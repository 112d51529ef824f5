use std::collections::BTreeMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash as PhcHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Serialize;
use serde_json::json;

use super::entity::*;
use super::enums::{EntityKind, WorkspaceFeature};
use super::values::{EmailAddress, EntityId, EntityName, InputValidationError};

/// A person using the application. Root entity.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub(crate) core: EntityCore,
    pub(crate) email_address: EmailAddress,
    pub(crate) name: EntityName,
}

impl User {
    pub fn new_user(ctx: &DomainContext, email_address: EmailAddress, name: EntityName) -> Self {
        let core = EntityCore::new_live(
            ctx,
            "new_user",
            json!({ "email_address": email_address, "name": name }),
        );
        Self {
            core,
            email_address,
            name,
        }
    }

    pub fn email_address(&self) -> &EmailAddress {
        &self.email_address
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

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

impl RootEntity for User {}

/// Per-workspace feature toggles. Unknown or missing features are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureFlags(BTreeMap<WorkspaceFeature, bool>);

impl Default for FeatureFlags {
    fn default() -> Self {
        Self(
            WorkspaceFeature::ALL
                .iter()
                .map(|feature| (*feature, true))
                .collect(),
        )
    }
}

impl FeatureFlags {
    pub fn is_enabled(&self, feature: WorkspaceFeature) -> bool {
        self.0.get(&feature).copied().unwrap_or(true)
    }

    pub fn with(mut self, feature: WorkspaceFeature, enabled: bool) -> Self {
        self.0.insert(feature, enabled);
        self
    }

    /// Parses the stored JSON object, ignoring keys this build doesn't know.
    pub fn from_json(raw: &str) -> Result<Self, InputValidationError> {
        let stored: BTreeMap<String, bool> = serde_json::from_str(raw)
            .map_err(|e| InputValidationError::new(format!("invalid feature flags: {e}")))?;
        let mut flags = Self::default();
        for (key, enabled) in stored {
            if let Ok(feature) = WorkspaceFeature::from_raw(&key) {
                flags.0.insert(feature, enabled);
            }
        }
        Ok(flags)
    }

    pub fn to_json(&self) -> String {
        let map: BTreeMap<&str, bool> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        json!(map).to_string()
    }
}

/// A tenant. Root entity owning one of every collection trunk.
#[derive(Debug, Clone, Serialize)]
pub struct Workspace {
    pub(crate) core: EntityCore,
    pub(crate) name: EntityName,
    pub(crate) owner_user_ref_id: EntityId,
    pub(crate) feature_flags: FeatureFlags,
}

impl Workspace {
    pub fn new_workspace(
        ctx: &DomainContext,
        owner: &User,
        name: EntityName,
        feature_flags: FeatureFlags,
    ) -> DomainResult<Self> {
        let owner_user_ref_id = owner.live_link()?.ref_id();
        let core = EntityCore::new_live(
            ctx,
            "new_workspace",
            json!({ "name": name, "owner_user_ref_id": owner_user_ref_id }),
        );
        Ok(Self {
            core,
            name,
            owner_user_ref_id,
            feature_flags,
        })
    }

    pub fn name(&self) -> &EntityName {
        &self.name
    }

    pub fn owner_user_ref_id(&self) -> EntityId {
        self.owner_user_ref_id
    }

    pub fn feature_flags(&self) -> &FeatureFlags {
        &self.feature_flags
    }

    pub fn check_feature(&self, feature: WorkspaceFeature) -> DomainResult<()> {
        if !self.feature_flags.is_enabled(feature) {
            return Err(DomainError::FeatureUnavailable(feature));
        }
        Ok(())
    }

    pub fn update_name(&mut self, ctx: &DomainContext, name: EntityName) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(ctx, "update_name", json!({ "name": name }));
        self.name = name;
        Ok(())
    }

    pub fn update_feature_flags(
        &mut self,
        ctx: &DomainContext,
        feature_flags: FeatureFlags,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        self.core.touch(
            ctx,
            "update_feature_flags",
            json!({ "feature_flags": feature_flags.to_json() }),
        );
        self.feature_flags = feature_flags;
        Ok(())
    }
}

impl Entity for Workspace {
    const KIND: EntityKind = EntityKind::Workspace;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

impl RootEntity for Workspace {}

const MIN_PASSWORD_LEN: usize = 8;

/// Argon2id hash in PHC string form; salt and parameters travel with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Checks the password policy without paying for a hash.
    pub fn check_plain(password: &str) -> Result<(), InputValidationError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(InputValidationError::new(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    pub fn from_plain(password: &str) -> Result<Self, InputValidationError> {
        Self::check_plain(password)?;
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|e| InputValidationError::new(format!("failed to hash password: {e}")))
    }

    pub fn from_raw(raw: &str) -> Result<Self, InputValidationError> {
        PhcHash::new(raw)
            .map_err(|e| InputValidationError::new(format!("malformed password hash: {e}")))?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_raw(&self) -> String {
        self.0.clone()
    }

    pub fn verify(&self, password: &str) -> bool {
        let Ok(parsed) = PhcHash::new(&self.0) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Credentials of a user. Exactly one per user.
#[derive(Debug, Clone, Serialize)]
pub struct Auth {
    pub(crate) core: EntityCore,
    pub(crate) user: ParentLink,
    #[serde(skip)]
    pub(crate) password_hash: PasswordHash,
}

impl Auth {
    pub fn new_auth(
        ctx: &DomainContext,
        user: ParentLink,
        password_hash: PasswordHash,
    ) -> DomainResult<Self> {
        let user = user.expect_kind(EntityKind::User)?;
        let core = EntityCore::new_live(ctx, "new_auth", json!({ "user_ref_id": user.ref_id() }));
        Ok(Self {
            core,
            user,
            password_hash,
        })
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn check_password(&self, password: &str) -> bool {
        self.password_hash.verify(password)
    }

    pub fn change_password(
        &mut self,
        ctx: &DomainContext,
        password_hash: PasswordHash,
    ) -> DomainResult<()> {
        self.ensure_live()?;
        // The hash itself never goes into the event log.
        self.core.touch(ctx, "change_password", serde_json::Value::Null);
        self.password_hash = password_hash;
        Ok(())
    }
}

impl Entity for Auth {
    const KIND: EntityKind = EntityKind::Auth;

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn parent(&self) -> Option<ParentLink> {
        Some(self.user)
    }
}

impl StubEntity for Auth {
    fn owner(&self) -> ParentLink {
        self.user
    }
}

use uuid::Uuid;

use crate::{auth::Identity, config::AppConfig, error::ApiError};

/// The kind of change a caller wants to make to an owned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Update,
    Delete,
}

/// can_modify
///
/// The owner may always modify; an admin only when `admin_bypass` is set.
/// Ownership is plain id equality against the resource's stored owner.
pub fn can_modify(identity: &Identity, owner_id: Uuid, admin_bypass: bool) -> bool {
    identity.subject_id == owner_id || (admin_bypass && identity.is_admin)
}

/// OwnershipGuard
///
/// Inline check run by the post and comment handlers after loading the resource
/// and before mutating it.
///
/// - Delete: owner or admin.
/// - Update: owner only, unless `admin_can_edit` is enabled (`ADMIN_CAN_EDIT`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnershipGuard {
    pub admin_can_edit: bool,
}

impl OwnershipGuard {
    pub fn new(admin_can_edit: bool) -> Self {
        Self { admin_can_edit }
    }

    pub fn allows(&self, identity: &Identity, owner_id: Uuid, mutation: Mutation) -> bool {
        let admin_bypass = match mutation {
            Mutation::Delete => true,
            Mutation::Update => self.admin_can_edit,
        };
        can_modify(identity, owner_id, admin_bypass)
    }

    pub fn ensure(
        &self,
        identity: &Identity,
        owner_id: Uuid,
        mutation: Mutation,
    ) -> Result<(), ApiError> {
        if self.allows(identity, owner_id, mutation) {
            return Ok(());
        }

        tracing::info!(
            user_id = %identity.subject_id,
            owner_id = %owner_id,
            mutation = ?mutation,
            "ownership check denied"
        );
        Err(ApiError::Forbidden(
            "access denied, you are not allowed".to_string(),
        ))
    }
}

impl From<&AppConfig> for OwnershipGuard {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.admin_can_edit)
    }
}

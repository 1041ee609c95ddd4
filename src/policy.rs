//! Authorization policies.
//!
//! Each policy is a predicate over an already resolved [`Identity`]. They compose
//! the identity extractor instead of decoding tokens themselves, so every route
//! shares one decode path and one error shape:
//!
//! | Policy              | Allows when                          | Rejection |
//! |---------------------|--------------------------------------|-----------|
//! | `Authenticated`     | a valid token is present             | 401       |
//! | `AdminOnly`         | `is_admin`                           | 403       |
//! | `SelfOnly`          | subject id equals the `{id}` segment | 403       |
//! | `SelfOrAdmin`       | either of the two above              | 403       |
//!
//! The extractors below apply a policy as a handler argument; [`require_identity`]
//! and [`require_admin`] apply them as route layers.

use axum::{
    extract::{FromRef, FromRequestParts, RawPathParams, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    auth::{AuthState, Identity},
    error::ApiError,
};

/// Name of the route segment SelfOnly and SelfOrAdmin compare against.
pub const TARGET_PARAM: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Authenticated,
    AdminOnly,
    SelfOnly,
    SelfOrAdmin,
}

impl Policy {
    /// check
    ///
    /// Pure decision for `identity` against the optional route target id. A missing
    /// target never satisfies the self check.
    pub fn check(self, identity: &Identity, target: Option<Uuid>) -> Result<(), ApiError> {
        let is_self = || target == Some(identity.subject_id);

        let allowed = match self {
            Policy::Authenticated => true,
            Policy::AdminOnly => identity.is_admin,
            Policy::SelfOnly => is_self(),
            // Self first, then admin; both read the decoded identity only.
            Policy::SelfOrAdmin => is_self() || identity.is_admin,
        };

        if allowed {
            return Ok(());
        }

        tracing::debug!(
            user_id = %identity.subject_id,
            policy = ?self,
            "authorization denied"
        );
        Err(ApiError::Forbidden(self.denial_message().to_string()))
    }

    fn denial_message(self) -> &'static str {
        match self {
            Policy::Authenticated => "Not allowed",
            Policy::AdminOnly => "Not allowed, only admin",
            Policy::SelfOnly => "Not allowed, only user himself",
            Policy::SelfOrAdmin => "Not allowed, only user himself or admin",
        }
    }
}

/// Reads the `{id}` route segment. Requires the request to have been routed.
async fn route_target<S>(parts: &mut Parts, state: &S) -> Result<Option<Uuid>, ApiError>
where
    S: Send + Sync,
{
    let params = RawPathParams::from_request_parts(parts, state)
        .await
        .map_err(|_| ApiError::BadRequest("missing route parameters".to_string()))?;

    params
        .iter()
        .find(|(key, _)| *key == TARGET_PARAM)
        .map(|(_, value)| {
            Uuid::parse_str(value).map_err(|_| ApiError::BadRequest("invalid id".to_string()))
        })
        .transpose()
}

async fn authorize<S>(
    parts: &mut Parts,
    state: &S,
    policy: Policy,
) -> Result<Identity, ApiError>
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    let identity = Identity::from_request_parts(parts, state).await?;
    let target = match policy {
        Policy::SelfOnly | Policy::SelfOrAdmin => route_target(parts, state).await?,
        Policy::Authenticated | Policy::AdminOnly => None,
    };
    policy.check(&identity, target)?;
    Ok(identity)
}

/// Identity of an administrator.
#[derive(Debug, Clone, Copy)]
pub struct AdminOnly(pub Identity);

/// Identity whose subject is the user named by the `{id}` route segment.
#[derive(Debug, Clone, Copy)]
pub struct SelfOnly(pub Identity);

/// Identity of the user named by `{id}`, or of an administrator.
#[derive(Debug, Clone, Copy)]
pub struct SelfOrAdmin(pub Identity);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Policy::AdminOnly).await.map(AdminOnly)
    }
}

impl<S> FromRequestParts<S> for SelfOnly
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Policy::SelfOnly).await.map(SelfOnly)
    }
}

impl<S> FromRequestParts<S> for SelfOrAdmin
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Policy::SelfOrAdmin)
            .await
            .map(SelfOrAdmin)
    }
}

/// require_identity
///
/// Route layer for the authenticated router. The `Identity` extractor rejects the
/// request with 401 before the handler runs; on success the identity is already
/// cached in the request extensions for the handler.
pub async fn require_identity(_identity: Identity, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_admin
///
/// Route layer for the admin router: 401 without a token, 403 for non-admins.
pub async fn require_admin(_admin: AdminOnly, request: Request, next: Next) -> Response {
    next.run(request).await
}

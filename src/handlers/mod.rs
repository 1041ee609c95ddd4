//! HTTP handlers, grouped by resource.
//!
//! Access control lives in two places: the policy extractors in each handler's
//! signature (and the route layers in [`crate::routes`]), and the ownership guard
//! each mutating post/comment handler runs after loading the resource.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::ApiError;

pub mod auth;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod system;
pub mod users;

/// IdParam
///
/// The `{id}` route segment parsed as a UUID. A malformed id is a 400 with the
/// usual JSON error body instead of axum's plain-text path rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParam(pub Uuid);

impl<S> FromRequestParts<S> for IdParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("invalid id".to_string()))?;
        Ok(IdParam(id))
    }
}

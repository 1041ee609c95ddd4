use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    auth::TokenError, media::MediaError, models::MessageResponse, password::PasswordError,
    repository::RepoError,
};

/// ApiError
///
/// The request-terminating error taxonomy. Every variant renders as a JSON body
/// of the form `{"message": "..."}` with the status code listed below.
///
/// | Variant           | Status |
/// |-------------------|--------|
/// | `Unauthenticated` | 401    |
/// | `Forbidden`       | 403    |
/// | `NotFound`        | 404    |
/// | `Validation`      | 400    |
/// | `BadRequest`      | 400    |
/// | `Internal`        | 500    |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No token, or a token that failed to decode.
    #[error("{0}")]
    Unauthenticated(String),
    /// A valid identity without the rights for the action.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// Request body rejected by a validator.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    /// The inner detail is logged, never sent to the client.
    #[error("internal server error")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed with an internal error");
        }

        let body = MessageResponse {
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Issue(detail) => ApiError::Internal(detail),
            other => ApiError::Unauthenticated(other.to_string()),
        }
    }
}

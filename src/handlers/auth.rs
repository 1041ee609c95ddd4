use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{Claims, Identity},
    error::{ApiError, ApiResult},
    models::{Image, LoginRequest, LoginResponse, MessageResponse, RegisterUserRequest},
    password::{hash_password, verify_password},
    repository::{NewUser, RepoError},
    validation::Validate,
};

/// register
///
/// [Public Route] Creates an account. The password is stored as an Argon2 hash;
/// a reused email is rejected before hashing.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Invalid body or email already registered", body = MessageResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    payload.validate()?;

    let email = payload.email.trim().to_string();
    if state.repo.find_credentials_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username.trim().to_string(),
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration for the same email.
            RepoError::Conflict(_) => ApiError::BadRequest("User already exists".to_string()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".to_string(),
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token. Unknown email
/// and wrong password produce the same response.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid email or password", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    payload.validate()?;

    let invalid = || ApiError::BadRequest("Invalid email or password".to_string());

    let creds = state
        .repo
        .find_credentials_by_email(payload.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &creds.password_hash) {
        tracing::info!(user_id = %creds.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let identity = Identity {
        subject_id: creds.id,
        is_admin: creds.is_admin,
    };
    let token = state.auth.codec.issue(&identity)?;

    tracing::info!(user_id = %creds.id, "user logged in");
    Ok(Json(LoginResponse {
        id: creds.id,
        is_admin: creds.is_admin,
        profile_photo: Image {
            url: creds.profile_photo_url,
            public_id: creds.profile_photo_public_id,
        },
        token,
    }))
}

/// logout
///
/// [Authenticated Route] Revokes the presented token. Other tokens held by the
/// same user stay valid until they expire.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(claims: Claims, State(state): State<AppState>) -> Json<MessageResponse> {
    state.auth.revoked.revoke(claims.jti, claims.exp);
    tracing::info!(user_id = %claims.sub, "token revoked");
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

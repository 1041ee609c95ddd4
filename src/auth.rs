use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Identity
///
/// The authenticated subject of one request and its privilege flag. It is derived
/// from the bearer token alone; nothing is re-read from the user table
/// (trust-the-token). Token expiry and the [`RevocationList`] bound how long a
/// stale privilege flag stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: Uuid,
    pub is_admin: bool,
}

/// Claims
///
/// The signed payload carried inside every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub is_admin: bool,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch. Validated on every decode.
    pub exp: i64,
    /// Token id; the key used by the revocation list.
    pub jti: Uuid,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.sub,
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature mismatch, malformed payload, or no secret configured.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token has expired")]
    Expired,
    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// TokenCodec
///
/// The only component that knows the token format. Tokens are HS256 JWTs signed
/// with the server secret; every other component treats them as opaque strings.
pub struct TokenCodec {
    secret: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.to_string(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Signs a fresh token for `identity`, valid for the configured lifetime.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Issue("token secret is not configured".to_string()));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: identity.subject_id,
            is_admin: identity.is_admin,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Verifies the signature and expiry of `token` and returns its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::InvalidToken(
                "token secret is not configured".to_string(),
            ));
        }

        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => {
                    TokenError::InvalidToken("invalid signature".to_string())
                }
                _ => TokenError::InvalidToken(e.to_string()),
            })
    }
}

/// RevocationList
///
/// Token ids invalidated before their natural expiry (logout). Each entry keeps
/// the token's own expiry so it can be dropped once the token would be rejected
/// anyway.
#[derive(Clone, Default)]
pub struct RevocationList {
    revoked: Arc<RwLock<HashMap<Uuid, i64>>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, jti: Uuid, expires_at: i64) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().unwrap_or_else(PoisonError::into_inner);
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(jti, expires_at);
    }

    pub fn is_revoked(&self, jti: Uuid) -> bool {
        self.revoked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&jti)
    }

    pub fn len(&self) -> usize {
        self.revoked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// AuthState
///
/// Everything the identity extractor needs from the application state.
#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
    pub revoked: RevocationList,
}

/// bearer_token
///
/// Takes the second space-separated segment of an `Authorization` header value and
/// strips ASCII control characters from it. Returns `None` when nothing usable is left.
pub fn bearer_token(header_value: &str) -> Option<String> {
    let token: String = header_value
        .split(' ')
        .nth(1)?
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect();

    if token.is_empty() { None } else { Some(token) }
}

/// Claims Extractor Implementation
///
/// Resolves the bearer token of the request exactly once. The decoded claims and
/// the derived [`Identity`] are cached in the request extensions, so policies and
/// handlers that extract again within the same request reuse the first result.
///
/// Rejection: [`ApiError::Unauthenticated`] (401) on any failure.
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(claims.clone());
        }

        let auth = AuthState::from_ref(state);

        // 1. Token Extraction
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .ok_or_else(|| ApiError::Unauthenticated("no token provided".to_string()))?;

        let token = bearer_token(&header_value).ok_or_else(|| {
            ApiError::Unauthenticated("malformed authorization header".to_string())
        })?;

        // 2. Decode and Validate
        let claims = auth.codec.decode(&token).map_err(|e| {
            tracing::warn!(error = %e, "rejected bearer token");
            ApiError::Unauthenticated(e.to_string())
        })?;

        // 3. Revocation Check
        if auth.revoked.is_revoked(claims.jti) {
            tracing::warn!(user_id = %claims.sub, "rejected revoked token");
            return Err(ApiError::Unauthenticated(
                "token has been revoked".to_string(),
            ));
        }

        parts.extensions.insert(claims.clone());
        parts.extensions.insert(claims.identity());
        Ok(claims)
    }
}

/// Identity Extractor Implementation
///
/// Using `Identity` as a handler argument is the AuthenticatedOnly policy: the
/// handler never runs without a valid token.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(*identity);
        }
        let claims = Claims::from_request_parts(parts, state).await?;
        Ok(claims.identity())
    }
}

use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};

use crate::{AppState, models::HealthResponse};

/// Service banner served at `/`.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the blog API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "auth": "/api/auth",
            "users": "/api/users",
            "posts": "/api/posts",
            "comments": "/api/comments",
            "categories": "/api/categories",
            "docs": "/swagger-ui",
        }
    }))
}

/// health_check
///
/// Liveness probe. Does not touch the database, so it answers even while the
/// pool has not been opened yet.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
        environment: state.config.env.as_str().to_string(),
    })
}

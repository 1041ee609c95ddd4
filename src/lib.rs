use std::{sync::Arc, time::Instant};

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderName, HeaderValue, header},
    middleware,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authentication and authorization chain.
pub mod auth;
pub mod ownership;
pub mod policy;

// Core application services and components.
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod password;
pub mod repository;
pub mod upload;
pub mod validation;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthState, RevocationList, TokenCodec};
pub use config::AppConfig;
pub use media::{MediaState, MockMediaService, S3MediaClient};
pub use ownership::OwnershipGuard;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

use handlers::{auth as auth_handlers, categories, comments, posts, system, users};

/// ApiDoc
///
/// The OpenAPI document for every `#[utoipa::path]` handler, served at
/// `/api-docs/openapi.json` and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        system::health_check,
        auth_handlers::register, auth_handlers::login, auth_handlers::logout,
        users::list_users, users::count_users, users::get_user_profile,
        users::update_user_profile, users::delete_user_profile, users::upload_profile_photo,
        posts::create_post, posts::list_posts, posts::count_posts, posts::get_post,
        posts::update_post, posts::delete_post, posts::upload_post_image, posts::toggle_like,
        comments::create_comment, comments::list_comments, comments::update_comment,
        comments::delete_comment,
        categories::create_category, categories::list_categories, categories::delete_category,
    ),
    components(
        schemas(
            models::User, models::Post, models::Comment, models::Category, models::Image,
            models::PostView, models::UserView,
            models::RegisterUserRequest, models::LoginRequest, models::UpdateUserRequest,
            models::CreatePostRequest, models::UpdatePostRequest, models::CreateCommentRequest,
            models::UpdateCommentRequest, models::CreateCategoryRequest,
            models::LoginResponse, models::MessageResponse, models::DeletedResponse,
            models::PhotoUploadResponse, models::HealthResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "blog-backend", description = "Blog API: users, posts, comments, categories")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single container of shared services, cloned into every request. Handlers
/// and extractors pull the parts they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// External image host.
    pub media: MediaState,
    pub config: AppConfig,
    /// Token codec and revocation list used by the identity extractor.
    pub auth: AuthState,
    pub ownership: OwnershipGuard,
    pub started_at: Instant,
}

impl AppState {
    /// new
    ///
    /// Derives the token codec and the ownership guard from `config`.
    pub fn new(repo: RepositoryState, media: MediaState, config: AppConfig) -> Self {
        let codec = TokenCodec::new(
            &config.jwt_secret,
            chrono::Duration::seconds(config.token_ttl_secs),
        );
        Self {
            repo,
            media,
            auth: AuthState {
                codec: Arc::new(codec),
                revoked: RevocationList::new(),
            },
            ownership: OwnershipGuard::from(&config),
            config,
            started_at: Instant::now(),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MediaState {
    fn from_ref(app_state: &AppState) -> MediaState {
        app_state.media.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

/// create_router
///
/// Assembles the routers under `/api`, applies the access layers and the
/// observability stack, and attaches the state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly
    let api = Router::new()
        .merge(public::public_routes())
        // Any valid token (401 otherwise).
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                policy::require_identity,
            )),
        )
        // Admin token (401 without a token, 403 for non-admins).
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                policy::require_admin,
            )),
        );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(system::root))
        .nest("/api", api)
        // Multipart uploads carry up to one image plus a few text fields.
        .layer(DefaultBodyLimit::max(upload::MAX_IMAGE_BYTES + 1024 * 1024))
        .with_state(state);

    // 3. Observability, correlation and security headers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
        // 4. CORS Layer (outermost)
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span: method, uri and the `x-request-id` set by the
/// layer above, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

use crate::{
    AppState,
    handlers::{auth, categories, posts, system, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read-only blog content plus the two credential-issuing endpoints. Nothing here
/// inspects the `Authorization` header.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe; reports uptime and environment.
        .route("/health", get(system::health_check))
        // POST /auth/register, POST /auth/login
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // GET /users/profile/{id}
        // Public profile with the user's posts.
        .route("/users/profile/{id}", get(users::get_user_profile))
        // GET /posts?pageNumber=&category=
        .route("/posts", get(posts::list_posts))
        .route("/posts/count", get(posts::count_posts))
        // GET /posts/{id}
        // Post detail with author and comments.
        .route("/posts/{id}", get(posts::get_post))
        .route("/categories", get(categories::list_categories))
}

use crate::{
    AppState,
    handlers::{categories, comments, users},
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Moderation and statistics. The `require_admin` layer answers 401 without a
/// token and 403 for a non-admin token.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users/profile
        // Every account.
        .route("/users/profile", get(users::list_users))
        .route("/users/count", get(users::count_users))
        // GET /comments
        // Every comment across all posts.
        .route("/comments", get(comments::list_comments))
        .route("/categories", post(categories::create_category))
        .route("/categories/{id}", delete(categories::delete_category))
}

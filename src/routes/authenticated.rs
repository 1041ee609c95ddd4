use crate::{
    AppState,
    handlers::{auth, comments, posts, users},
};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Every route here requires a valid bearer token; the `require_identity` layer
/// applied in `create_router` rejects the request with 401 before any handler runs.
///
/// Finer checks happen per route:
/// - `/users/profile/{id}`: SelfOnly (PUT) and SelfOrAdmin (DELETE) extractors.
/// - posts and comments: the ownership guard, after the resource is loaded.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /auth/logout
        // Revokes the presented token.
        .route("/auth/logout", post(auth::logout))
        // PUT/DELETE /users/profile/{id}
        .route(
            "/users/profile/{id}",
            put(users::update_user_profile).delete(users::delete_user_profile),
        )
        // POST /users/profile/profile-photo-upload
        // Multipart `image`; replaces the caller's photo.
        .route(
            "/users/profile/profile-photo-upload",
            post(users::upload_profile_photo),
        )
        // --- Posts ---
        .route("/posts", post(posts::create_post))
        .route(
            "/posts/{id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/upload-image/{id}", put(posts::upload_post_image))
        // PUT /posts/like/{id}
        // Toggle: a second call removes the like.
        .route("/posts/like/{id}", put(posts::toggle_like))
        // --- Comments ---
        .route("/comments", post(comments::create_comment))
        .route(
            "/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
}

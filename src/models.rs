use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Placeholder avatar assigned to every new account until a photo is uploaded.
pub const DEFAULT_PROFILE_PHOTO: &str = "https://media.istockphoto.com/id/512830984/photo/icon-man-on-a-white-background-3d-render.jpg?s=612x612&w=is&k=20&c=Gt5zB5VkyrCjJ-G-yBwa-O2mFgDHuUykth9FGnPlv4w=";

/// Number of posts per page on `GET /api/posts?pageNumber=N`.
pub const POSTS_PER_PAGE: i64 = 6;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Public view of a row in the `users` table. The password hash lives in
/// [`UserCredentials`] and never leaves the repository layer through this type.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_photo_url: String,
    // Media host identifier; `None` while the default avatar is in use.
    pub profile_photo_public_id: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub is_account_verified: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// UserCredentials
///
/// The subset of a user row needed to check a login attempt and mint a token.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub profile_photo_url: String,
    pub profile_photo_public_id: Option<String>,
}

/// Post
///
/// A blog post. `user_id` is the owner consulted by the ownership guard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    pub image_public_id: Option<String>,
    // Ids of users who liked the post; toggled by PUT /api/posts/like/{id}.
    pub likes: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// `username` is copied from the author's profile when the comment is created.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub username: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    // The admin who created the category.
    pub user_id: Uuid,
    pub title: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Image
///
/// A stored media asset: the public URL plus the media host identifier used to remove it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Image {
    pub url: String,
    pub public_id: Option<String>,
}

// --- Composite Views (Output) ---

/// PostView
///
/// A post with its author populated and, on the detail endpoint, its comments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub user: Option<User>,
    pub comments: Vec<Comment>,
}

/// UserView
///
/// A public profile together with the posts the user has written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub posts: Vec<Post>,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// UpdateUserRequest
///
/// `username` is always required; a present `password` is re-hashed before storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// CreatePostRequest
///
/// The text fields of the multipart form sent to POST /api/posts. The image
/// travels alongside them in the `image` part.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub description: String,
    pub category: String,
}

/// UpdatePostRequest
///
/// Partial update; omitted fields keep their stored values.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    pub title: String,
}

/// PostFilter
///
/// Query parameters for GET /api/posts. A page number takes precedence over the
/// category filter.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct PostFilter {
    /// 1-based page of six posts.
    #[serde(default, rename = "pageNumber")]
    pub page_number: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
}

// --- Responses ---

/// LoginResponse
///
/// Returned by POST /api/auth/login. `token` is the bearer credential for every
/// authenticated route.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub id: Uuid,
    pub is_admin: bool,
    pub profile_photo: Image,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct DeletedResponse {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PhotoUploadResponse {
    pub message: String,
    pub profile_photo: Image,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub uptime_secs: u64,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

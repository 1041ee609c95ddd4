use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Category, Comment, Image, Post, User, UserCredentials};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

// --- Write Models ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// UserChanges
///
/// Profile update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: Image,
}

#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// PostQuery
///
/// Listing filter: a page (1-based, `per_page` posts) wins over a category; with
/// neither, every post is returned. Results are always newest first.
#[derive(Debug, Clone)]
pub struct PostQuery {
    pub page: Option<i64>,
    pub category: Option<String>,
    pub per_page: i64,
}

impl PostQuery {
    /// Row offset for the requested page; pages below 1 are treated as page 1.
    /// Never negative: an absurdly large page saturates and lists nothing.
    pub fn offset(&self) -> Option<i64> {
        self.page
            .map(|page| (page.max(1) - 1).saturating_mul(self.per_page.max(0)))
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub username: String,
}

/// Repository Trait
///
/// The persistence contract consumed by the handlers. Ownership is deliberately
/// absent here: handlers load a resource, run the ownership guard, then mutate.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<UserCredentials>>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_users(&self, ids: &[Uuid]) -> RepoResult<Vec<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn count_users(&self) -> RepoResult<i64>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>>;
    async fn set_profile_photo(&self, id: Uuid, photo: Image) -> RepoResult<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> RepoResult<bool>;

    // --- Posts ---
    async fn create_post(&self, post: NewPost) -> RepoResult<Post>;
    async fn list_posts(&self, query: PostQuery) -> RepoResult<Vec<Post>>;
    async fn count_posts(&self) -> RepoResult<i64>;
    async fn get_post(&self, id: Uuid) -> RepoResult<Option<Post>>;
    async fn posts_by_user(&self, user_id: Uuid) -> RepoResult<Vec<Post>>;
    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<Option<Post>>;
    async fn set_post_image(&self, id: Uuid, image: Image) -> RepoResult<Option<Post>>;
    // Adds the user's like, or removes it if already present.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<Option<Post>>;
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool>;
    async fn delete_posts_by_user(&self, user_id: Uuid) -> RepoResult<u64>;

    // --- Comments ---
    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment>;
    async fn list_comments(&self) -> RepoResult<Vec<Comment>>;
    async fn comments_for_post(&self, post_id: Uuid) -> RepoResult<Vec<Comment>>;
    async fn get_comment(&self, id: Uuid) -> RepoResult<Option<Comment>>;
    async fn update_comment(&self, id: Uuid, text: String) -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool>;
    async fn delete_comments_by_post(&self, post_id: Uuid) -> RepoResult<u64>;
    async fn delete_comments_by_user(&self, user_id: Uuid) -> RepoResult<u64>;

    // --- Categories ---
    async fn create_category(&self, user_id: Uuid, title: String) -> RepoResult<Category>;
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn delete_category(&self, id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

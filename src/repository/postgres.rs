use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    NewComment, NewPost, NewUser, PostChanges, PostQuery, RepoError, RepoResult, Repository,
    UserChanges,
};
use crate::{
    db::Database,
    models::{Category, Comment, DEFAULT_PROFILE_PHOTO, Image, Post, User, UserCredentials},
};

macro_rules! user_columns {
    () => {
        "id, username, email, profile_photo_url, profile_photo_public_id, bio, is_admin, is_account_verified, created_at, updated_at"
    };
}

macro_rules! post_columns {
    () => {
        "id, user_id, title, description, category, image_url, image_public_id, likes, created_at, updated_at"
    };
}

macro_rules! comment_columns {
    () => {
        "id, post_id, user_id, text, username, created_at, updated_at"
    };
}

macro_rules! category_columns {
    () => {
        "id, user_id, title, created_at, updated_at"
    };
}

/// PostgresRepository
///
/// The production implementation of [`Repository`]. Every call goes through the
/// shared [`Database`] handle, which connects on first use.
pub struct PostgresRepository {
    db: Arc<Database>,
}

impl PostgresRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn pool(&self) -> RepoResult<&PgPool> {
        Ok(self.db.pool().await?)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (id, username, email, password_hash, profile_photo_url) ",
            "VALUES ($1, $2, $3, $4, $5) RETURNING ",
            user_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(DEFAULT_PROFILE_PHOTO)
        .fetch_one(self.pool().await?)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                RepoError::Conflict("email already registered".to_string())
            }
            _ => RepoError::Database(e),
        })?;
        Ok(created)
    }

    async fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password_hash, is_admin, profile_photo_url, profile_photo_public_id \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(creds)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(user)
    }

    async fn get_users(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let users = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool().await?)
        .await?;
        Ok(users)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(self.pool().await?)
        .await?;
        Ok(users)
    }

    async fn count_users(&self) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool().await?)
            .await?;
        Ok(count)
    }

    /// update_user
    ///
    /// Partial update via `COALESCE`: only `Some` fields overwrite their column.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET username = COALESCE($2, username), ",
            "password_hash = COALESCE($3, password_hash), ",
            "bio = COALESCE($4, bio), updated_at = NOW() ",
            "WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.password_hash)
        .bind(changes.bio)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(user)
    }

    async fn set_profile_photo(&self, id: Uuid, photo: Image) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET profile_photo_url = $2, profile_photo_public_id = $3, ",
            "updated_at = NOW() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(photo.url)
        .bind(photo.public_id)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- POSTS ---

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        let created = sqlx::query_as::<_, Post>(concat!(
            "INSERT INTO posts (id, user_id, title, description, category, image_url, image_public_id) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            post_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(post.user_id)
        .bind(post.title)
        .bind(post.description)
        .bind(post.category)
        .bind(post.image.url)
        .bind(post.image.public_id)
        .fetch_one(self.pool().await?)
        .await?;
        Ok(created)
    }

    /// list_posts
    ///
    /// Built with `QueryBuilder` so the optional filters stay parameterized.
    async fn list_posts(&self, query: PostQuery) -> RepoResult<Vec<Post>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(concat!("SELECT ", post_columns!(), " FROM posts"));

        match (query.offset(), query.category.as_deref()) {
            (Some(offset), _) => {
                builder.push(" ORDER BY created_at DESC LIMIT ");
                builder.push_bind(query.per_page);
                builder.push(" OFFSET ");
                builder.push_bind(offset);
            }
            (None, Some(category)) => {
                builder.push(" WHERE category = ");
                builder.push_bind(category.to_string());
                builder.push(" ORDER BY created_at DESC");
            }
            (None, None) => {
                builder.push(" ORDER BY created_at DESC");
            }
        }

        let posts = builder
            .build_query_as::<Post>()
            .fetch_all(self.pool().await?)
            .await?;
        Ok(posts)
    }

    async fn count_posts(&self) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool().await?)
            .await?;
        Ok(count)
    }

    async fn get_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(post)
    }

    async fn posts_by_user(&self, user_id: Uuid) -> RepoResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(concat!(
            "SELECT ",
            post_columns!(),
            " FROM posts WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool().await?)
        .await?;
        Ok(posts)
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(concat!(
            "UPDATE posts SET title = COALESCE($2, title), ",
            "description = COALESCE($3, description), ",
            "category = COALESCE($4, category), updated_at = NOW() ",
            "WHERE id = $1 RETURNING ",
            post_columns!()
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.category)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(post)
    }

    async fn set_post_image(&self, id: Uuid, image: Image) -> RepoResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(concat!(
            "UPDATE posts SET image_url = $2, image_public_id = $3, updated_at = NOW() ",
            "WHERE id = $1 RETURNING ",
            post_columns!()
        ))
        .bind(id)
        .bind(image.url)
        .bind(image.public_id)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(post)
    }

    /// toggle_like
    ///
    /// Single statement, so concurrent toggles by the same user cannot both add.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(concat!(
            "UPDATE posts SET likes = CASE WHEN $2 = ANY(likes) ",
            "THEN array_remove(likes, $2) ELSE array_append(likes, $2) END ",
            "WHERE id = $1 RETURNING ",
            post_columns!()
        ))
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_posts_by_user(&self, user_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected())
    }

    // --- COMMENTS ---

    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        let created = sqlx::query_as::<_, Comment>(concat!(
            "INSERT INTO comments (id, post_id, user_id, text, username) ",
            "VALUES ($1, $2, $3, $4, $5) RETURNING ",
            comment_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.text)
        .bind(comment.username)
        .fetch_one(self.pool().await?)
        .await?;
        Ok(created)
    }

    async fn list_comments(&self) -> RepoResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM comments ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool().await?)
        .await?;
        Ok(comments)
    }

    async fn comments_for_post(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM comments WHERE post_id = $1 ORDER BY created_at ASC"
        ))
        .bind(post_id)
        .fetch_all(self.pool().await?)
        .await?;
        Ok(comments)
    }

    async fn get_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(comment)
    }

    async fn update_comment(&self, id: Uuid, text: String) -> RepoResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(concat!(
            "UPDATE comments SET text = $2, updated_at = NOW() WHERE id = $1 RETURNING ",
            comment_columns!()
        ))
        .bind(id)
        .bind(text)
        .fetch_optional(self.pool().await?)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_comments_by_user(&self, user_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected())
    }

    // --- CATEGORIES ---

    async fn create_category(&self, user_id: Uuid, title: String) -> RepoResult<Category> {
        let category = sqlx::query_as::<_, Category>(concat!(
            "INSERT INTO categories (id, user_id, title) VALUES ($1, $2, $3) RETURNING ",
            category_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .fetch_one(self.pool().await?)
        .await?;
        Ok(category)
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories ORDER BY created_at ASC"
        ))
        .fetch_all(self.pool().await?)
        .await?;
        Ok(categories)
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

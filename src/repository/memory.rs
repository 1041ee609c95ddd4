use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    NewComment, NewPost, NewUser, PostChanges, PostQuery, RepoError, RepoResult, Repository,
    UserChanges,
};
use crate::models::{Category, Comment, DEFAULT_PROFILE_PHOTO, Image, Post, User, UserCredentials};

#[derive(Default)]
struct Store {
    // (public row, password hash)
    users: Vec<(User, String)>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    categories: Vec<Category>,
}

/// MemoryRepository
///
/// A process-local [`Repository`] used by the test suite and for running the API
/// without a database. Rows are kept in insertion order; listings sort the same
/// way the Postgres queries do, with later inserts winning timestamp ties.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user directly with the admin flag set. There is no HTTP route
    /// that grants admin rights.
    pub fn insert_admin(&self, user: NewUser) -> User {
        let mut store = self.lock();
        let row = new_user_row(user.username, user.email, true);
        store.users.push((row.clone(), user.password_hash));
        row
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_user_row(username: String, email: String, is_admin: bool) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username,
        email,
        profile_photo_url: DEFAULT_PROFILE_PHOTO.to_string(),
        profile_photo_public_id: None,
        bio: None,
        is_admin,
        is_account_verified: false,
        created_at: now,
        updated_at: now,
    }
}

/// Newest first; for equal timestamps the later insert comes first.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut indexed: Vec<(usize, &T)> = rows.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| created_at(b).cmp(&created_at(a)).then(ib.cmp(ia)));
    indexed.into_iter().map(|(_, row)| row.clone()).collect()
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.lock();
        if store.users.iter().any(|(u, _)| u.email == user.email) {
            return Err(RepoError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        let row = new_user_row(user.username, user.email, false);
        store.users.push((row.clone(), user.password_hash));
        Ok(row)
    }

    async fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let store = self.lock();
        Ok(store
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                id: u.id,
                email: u.email.clone(),
                password_hash: hash.clone(),
                is_admin: u.is_admin,
                profile_photo_url: u.profile_photo_url.clone(),
                profile_photo_public_id: u.profile_photo_public_id.clone(),
            }))
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.lock();
        Ok(store.users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone()))
    }

    async fn get_users(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        let store = self.lock();
        Ok(store
            .users
            .iter()
            .filter(|(u, _)| ids.contains(&u.id))
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let store = self.lock();
        Ok(store.users.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn count_users(&self) -> RepoResult<i64> {
        Ok(self.lock().users.len() as i64)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut store = self.lock();
        let Some((user, hash)) = store.users.iter_mut().find(|(u, _)| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(password_hash) = changes.password_hash {
            *hash = password_hash;
        }
        if let Some(bio) = changes.bio {
            user.bio = Some(bio);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_profile_photo(&self, id: Uuid, photo: Image) -> RepoResult<Option<User>> {
        let mut store = self.lock();
        let Some((user, _)) = store.users.iter_mut().find(|(u, _)| u.id == id) else {
            return Ok(None);
        };
        user.profile_photo_url = photo.url;
        user.profile_photo_public_id = photo.public_id;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.users.len();
        store.users.retain(|(u, _)| u.id != id);
        Ok(store.users.len() < before)
    }

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        let mut store = self.lock();
        let now = Utc::now();
        let row = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            title: post.title,
            description: post.description,
            category: post.category,
            image_url: post.image.url,
            image_public_id: post.image.public_id,
            likes: vec![],
            created_at: now,
            updated_at: now,
        };
        store.posts.push(row.clone());
        Ok(row)
    }

    async fn list_posts(&self, query: PostQuery) -> RepoResult<Vec<Post>> {
        let store = self.lock();
        let sorted = newest_first(&store.posts, |p| p.created_at);

        let posts = match (query.offset(), query.category.as_deref()) {
            (Some(offset), _) => sorted
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(query.per_page as usize)
                .collect(),
            (None, Some(category)) => sorted
                .into_iter()
                .filter(|p| p.category == category)
                .collect(),
            (None, None) => sorted,
        };
        Ok(posts)
    }

    async fn count_posts(&self) -> RepoResult<i64> {
        Ok(self.lock().posts.len() as i64)
    }

    async fn get_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        Ok(self.lock().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn posts_by_user(&self, user_id: Uuid) -> RepoResult<Vec<Post>> {
        let store = self.lock();
        let owned: Vec<Post> = store
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |p| p.created_at))
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<Option<Post>> {
        let mut store = self.lock();
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(description) = changes.description {
            post.description = description;
        }
        if let Some(category) = changes.category {
            post.category = category;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn set_post_image(&self, id: Uuid, image: Image) -> RepoResult<Option<Post>> {
        let mut store = self.lock();
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.image_url = image.url;
        post.image_public_id = image.public_id;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<Option<Post>> {
        let mut store = self.lock();
        let Some(post) = store.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(None);
        };
        if post.likes.contains(&user_id) {
            post.likes.retain(|id| *id != user_id);
        } else {
            post.likes.push(user_id);
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.posts.len();
        store.posts.retain(|p| p.id != id);
        Ok(store.posts.len() < before)
    }

    async fn delete_posts_by_user(&self, user_id: Uuid) -> RepoResult<u64> {
        let mut store = self.lock();
        let before = store.posts.len();
        store.posts.retain(|p| p.user_id != user_id);
        Ok((before - store.posts.len()) as u64)
    }

    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        let mut store = self.lock();
        let now = Utc::now();
        let row = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            text: comment.text,
            username: comment.username,
            created_at: now,
            updated_at: now,
        };
        store.comments.push(row.clone());
        Ok(row)
    }

    async fn list_comments(&self) -> RepoResult<Vec<Comment>> {
        let store = self.lock();
        Ok(newest_first(&store.comments, |c| c.created_at))
    }

    async fn comments_for_post(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        let store = self.lock();
        Ok(store
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn get_comment(&self, id: Uuid) -> RepoResult<Option<Comment>> {
        Ok(self.lock().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn update_comment(&self, id: Uuid, text: String) -> RepoResult<Option<Comment>> {
        let mut store = self.lock();
        let Some(comment) = store.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        comment.text = text;
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.comments.len();
        store.comments.retain(|c| c.id != id);
        Ok(store.comments.len() < before)
    }

    async fn delete_comments_by_post(&self, post_id: Uuid) -> RepoResult<u64> {
        let mut store = self.lock();
        let before = store.comments.len();
        store.comments.retain(|c| c.post_id != post_id);
        Ok((before - store.comments.len()) as u64)
    }

    async fn delete_comments_by_user(&self, user_id: Uuid) -> RepoResult<u64> {
        let mut store = self.lock();
        let before = store.comments.len();
        store.comments.retain(|c| c.user_id != user_id);
        Ok((before - store.comments.len()) as u64)
    }

    async fn create_category(&self, user_id: Uuid, title: String) -> RepoResult<Category> {
        let mut store = self.lock();
        let now = Utc::now();
        let row = Category {
            id: Uuid::new_v4(),
            user_id,
            title,
            created_at: now,
            updated_at: now,
        };
        store.categories.push(row.clone());
        Ok(row)
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(self.lock().categories.clone())
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.categories.len();
        store.categories.retain(|c| c.id != id);
        Ok(store.categories.len() < before)
    }
}

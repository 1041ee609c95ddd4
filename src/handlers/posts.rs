use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::IdParam;
use crate::{
    AppState,
    auth::Identity,
    error::{ApiError, ApiResult},
    models::{
        CreatePostRequest, DeletedResponse, Image, MessageResponse, POSTS_PER_PAGE, Post,
        PostFilter, PostView, UpdatePostRequest,
    },
    ownership::Mutation,
    repository::{NewPost, PostChanges, PostQuery},
    upload::read_image_form,
    validation::Validate,
};

fn post_not_found() -> ApiError {
    ApiError::NotFound("Post not found".to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// create_post
///
/// [Authenticated Route] Multipart form with `title`, `description`, `category`
/// and an `image` part. The caller becomes the owner.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    request_body(content_type = "multipart/form-data", description = "Post fields plus an `image` file part"),
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Invalid fields or missing image", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    identity: Identity,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let form = read_image_form(multipart, &state.config.upload_dir).await?;

    let payload = CreatePostRequest {
        title: form.field("title"),
        description: form.field("description"),
        category: form.field("category"),
    };
    if let Err(e) = payload.validate() {
        form.discard().await;
        return Err(e);
    }
    let Some(image) = form.image else {
        return Err(ApiError::Validation("no image provided".to_string()));
    };

    let uploaded = state
        .media
        .upload_image(image.path(), image.content_type())
        .await;
    image.discard().await;
    let image: Image = uploaded?.into();

    let post = state
        .repo
        .create_post(NewPost {
            user_id: identity.subject_id,
            title: payload.title.trim().to_string(),
            description: payload.description.trim().to_string(),
            category: payload.category.trim().to_string(),
            image,
        })
        .await?;

    tracing::info!(post_id = %post.id, user_id = %identity.subject_id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// list_posts
///
/// [Public Route] Newest first. `pageNumber` selects a page of six posts and takes
/// precedence over `category`; with neither, every post is returned. Each post
/// carries its author.
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(PostFilter),
    responses((status = 200, description = "Posts", body = [PostView]))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state
        .repo
        .list_posts(PostQuery {
            page: filter.page_number,
            category: filter.category,
            per_page: POSTS_PER_PAGE,
        })
        .await?;

    let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors: HashMap<Uuid, _> = state
        .repo
        .get_users(&author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let views = posts
        .into_iter()
        .map(|post| PostView {
            user: authors.get(&post.user_id).cloned(),
            post,
            comments: vec![],
        })
        .collect();
    Ok(Json(views))
}

#[utoipa::path(
    get,
    path = "/api/posts/count",
    tag = "posts",
    responses((status = 200, description = "Number of posts", body = i64))
)]
pub async fn count_posts(State(state): State<AppState>) -> ApiResult<Json<i64>> {
    Ok(Json(state.repo.count_posts().await?))
}

/// get_post
///
/// [Public Route] A single post with its author and comments.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = PostView),
        (status = 404, description = "Post not found", body = MessageResponse)
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<PostView>> {
    let post = state.repo.get_post(id).await?.ok_or_else(post_not_found)?;
    let user = state.repo.get_user(post.user_id).await?;
    let comments = state.repo.comments_for_post(id).await?;
    Ok(Json(PostView {
        post,
        user,
        comments,
    }))
}

/// update_post
///
/// [Authenticated Route] Partial update of the text fields. Owner only, unless
/// admin edits are enabled.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated post", body = Post),
        (status = 403, description = "Not the owner", body = MessageResponse),
        (status = 404, description = "Post not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_post(
    identity: Identity,
    State(state): State<AppState>,
    IdParam(id): IdParam,
    Json(payload): Json<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    payload.validate()?;

    let post = state.repo.get_post(id).await?.ok_or_else(post_not_found)?;
    state
        .ownership
        .ensure(&identity, post.user_id, Mutation::Update)?;

    let changes = PostChanges {
        title: trimmed(payload.title),
        description: trimmed(payload.description),
        category: trimmed(payload.category),
    };
    let updated = state
        .repo
        .update_post(id, changes)
        .await?
        .ok_or_else(post_not_found)?;
    Ok(Json(updated))
}

/// delete_post
///
/// [Authenticated Route] Owner or admin. Removes the image from the media host and
/// every comment on the post before deleting it.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted", body = DeletedResponse),
        (status = 403, description = "Neither the owner nor an admin", body = MessageResponse),
        (status = 404, description = "Post not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_post(
    identity: Identity,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<DeletedResponse>> {
    let post = state.repo.get_post(id).await?.ok_or_else(post_not_found)?;
    state
        .ownership
        .ensure(&identity, post.user_id, Mutation::Delete)?;

    if let Some(public_id) = &post.image_public_id {
        state.media.remove_image(public_id).await?;
    }
    let comments_removed = state.repo.delete_comments_by_post(id).await?;
    state.repo.delete_post(id).await?;

    tracing::info!(
        post_id = %id,
        deleted_by = %identity.subject_id,
        comments_removed,
        "post deleted"
    );
    Ok(Json(DeletedResponse {
        message: "Post deleted successfully".to_string(),
        id,
    }))
}

/// upload_post_image
///
/// [Authenticated Route] Replaces the post image. Same ownership rule as
/// [`update_post`]; the old image is removed once the new one is stored.
#[utoipa::path(
    put,
    path = "/api/posts/upload-image/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body(content_type = "multipart/form-data", description = "`image` file part"),
    responses(
        (status = 200, description = "Updated post", body = Post),
        (status = 400, description = "Missing or non-image file", body = MessageResponse),
        (status = 403, description = "Not the owner", body = MessageResponse),
        (status = 404, description = "Post not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_post_image(
    identity: Identity,
    State(state): State<AppState>,
    IdParam(id): IdParam,
    multipart: Multipart,
) -> ApiResult<Json<Post>> {
    let post = state.repo.get_post(id).await?.ok_or_else(post_not_found)?;
    state
        .ownership
        .ensure(&identity, post.user_id, Mutation::Update)?;

    let form = read_image_form(multipart, &state.config.upload_dir).await?;
    let Some(image) = form.image else {
        return Err(ApiError::Validation("no image provided".to_string()));
    };

    let uploaded = state
        .media
        .upload_image(image.path(), image.content_type())
        .await;
    image.discard().await;
    let new_image: Image = uploaded?.into();

    let updated = state
        .repo
        .set_post_image(id, new_image)
        .await?
        .ok_or_else(post_not_found)?;

    if let Some(old_id) = &post.image_public_id {
        if let Err(e) = state.media.remove_image(old_id).await {
            tracing::warn!(error = %e, public_id = %old_id, "failed to remove old post image");
        }
    }
    Ok(Json(updated))
}

/// toggle_like
///
/// [Authenticated Route] Adds the caller's like, or removes it if present.
#[utoipa::path(
    put,
    path = "/api/posts/like/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with updated likes", body = Post),
        (status = 404, description = "Post not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_like(
    identity: Identity,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<Post>> {
    let post = state
        .repo
        .toggle_like(id, identity.subject_id)
        .await?
        .ok_or_else(post_not_found)?;
    Ok(Json(post))
}

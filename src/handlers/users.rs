use axum::{
    Json,
    extract::{Multipart, State},
};

use super::IdParam;
use crate::{
    AppState,
    auth::Identity,
    error::{ApiError, ApiResult},
    models::{Image, MessageResponse, PhotoUploadResponse, UpdateUserRequest, User, UserView},
    password::hash_password,
    policy::{SelfOnly, SelfOrAdmin},
    repository::UserChanges,
    upload::read_image_form,
    validation::Validate,
};

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// list_users
///
/// [Admin Route] Every account, oldest first.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

/// count_users
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/api/users/count",
    tag = "users",
    responses((status = 200, description = "Number of users", body = i64)),
    security(("bearer_auth" = []))
)]
pub async fn count_users(State(state): State<AppState>) -> ApiResult<Json<i64>> {
    Ok(Json(state.repo.count_users().await?))
}

/// get_user_profile
///
/// [Public Route] A profile together with the user's posts, newest first.
#[utoipa::path(
    get,
    path = "/api/users/profile/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile", body = UserView),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn get_user_profile(
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<UserView>> {
    let user = state.repo.get_user(id).await?.ok_or_else(user_not_found)?;
    let posts = state.repo.posts_by_user(id).await?;
    Ok(Json(UserView { user, posts }))
}

/// update_user_profile
///
/// [SelfOnly] Changes username, bio and optionally the password, which is
/// re-hashed. Admins cannot edit other users' profiles.
#[utoipa::path(
    put,
    path = "/api/users/profile/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 403, description = "Not the profile owner", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_profile(
    SelfOnly(_identity): SelfOnly,
    State(state): State<AppState>,
    IdParam(id): IdParam,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    payload.validate()?;

    let password_hash = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let changes = UserChanges {
        username: Some(payload.username.trim().to_string()),
        password_hash,
        bio: payload.bio,
    };

    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user))
}

/// delete_user_profile
///
/// [SelfOrAdmin] Removes the account and everything it owns: post images and the
/// profile photo on the media host, then the user's comments, the comments on
/// the user's posts, the posts and finally the user row.
#[utoipa::path(
    delete,
    path = "/api/users/profile/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile deleted", body = MessageResponse),
        (status = 403, description = "Neither the owner nor an admin", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user_profile(
    SelfOrAdmin(identity): SelfOrAdmin,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<MessageResponse>> {
    let user = state.repo.get_user(id).await?.ok_or_else(user_not_found)?;

    let posts = state.repo.posts_by_user(id).await?;
    let image_ids: Vec<String> = posts
        .iter()
        .filter_map(|post| post.image_public_id.clone())
        .collect();
    if !image_ids.is_empty() {
        state.media.remove_images(&image_ids).await?;
    }
    if let Some(photo_id) = &user.profile_photo_public_id {
        state.media.remove_image(photo_id).await?;
    }

    let mut comments_removed = state.repo.delete_comments_by_user(id).await?;
    for post in &posts {
        comments_removed += state.repo.delete_comments_by_post(post.id).await?;
    }
    let posts_removed = state.repo.delete_posts_by_user(id).await?;
    state.repo.delete_user(id).await?;

    tracing::info!(
        user_id = %id,
        deleted_by = %identity.subject_id,
        posts_removed,
        comments_removed,
        "user deleted"
    );
    Ok(Json(MessageResponse {
        message: "your profile has been deleted".to_string(),
    }))
}

/// upload_profile_photo
///
/// [Authenticated Route] Replaces the caller's profile photo with the multipart
/// `image` part. The previous photo is removed from the media host afterwards.
#[utoipa::path(
    post,
    path = "/api/users/profile/profile-photo-upload",
    tag = "users",
    request_body(content_type = "multipart/form-data", description = "`image` file part"),
    responses(
        (status = 200, description = "Photo replaced", body = PhotoUploadResponse),
        (status = 400, description = "Missing or non-image file", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_profile_photo(
    identity: Identity,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PhotoUploadResponse>> {
    let user = state
        .repo
        .get_user(identity.subject_id)
        .await?
        .ok_or_else(user_not_found)?;

    let form = read_image_form(multipart, &state.config.upload_dir).await?;
    let Some(image) = form.image else {
        return Err(ApiError::Validation("no file provided".to_string()));
    };

    let uploaded = state
        .media
        .upload_image(image.path(), image.content_type())
        .await;
    image.discard().await;
    let photo: Image = uploaded?.into();

    state
        .repo
        .set_profile_photo(user.id, photo.clone())
        .await?
        .ok_or_else(user_not_found)?;

    if let Some(old_id) = &user.profile_photo_public_id {
        if let Err(e) = state.media.remove_image(old_id).await {
            tracing::warn!(error = %e, public_id = %old_id, "failed to remove old profile photo");
        }
    }

    Ok(Json(PhotoUploadResponse {
        message: "your profile photo uploaded successfully".to_string(),
        profile_photo: photo,
    }))
}

use axum::{Json, extract::State, http::StatusCode};

use super::IdParam;
use crate::{
    AppState,
    auth::Identity,
    error::{ApiError, ApiResult},
    models::{Comment, CreateCommentRequest, DeletedResponse, MessageResponse, UpdateCommentRequest},
    ownership::Mutation,
    repository::NewComment,
    validation::Validate,
};

fn comment_not_found() -> ApiError {
    ApiError::NotFound("Comment not found".to_string())
}

/// create_comment
///
/// [Authenticated Route] Comments on an existing post. The author's current
/// username is copied onto the comment.
#[utoipa::path(
    post,
    path = "/api/comments",
    tag = "comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 404, description = "Post or user not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_comment(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    payload.validate()?;

    if state.repo.get_post(payload.post_id).await?.is_none() {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }
    let author = state
        .repo
        .get_user(identity.subject_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let comment = state
        .repo
        .create_comment(NewComment {
            post_id: payload.post_id,
            user_id: identity.subject_id,
            text: payload.text.trim().to_string(),
            username: author.username,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// list_comments
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/api/comments",
    tag = "comments",
    responses((status = 200, description = "All comments", body = [Comment])),
    security(("bearer_auth" = []))
)]
pub async fn list_comments(State(state): State<AppState>) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.repo.list_comments().await?))
}

#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    tag = "comments",
    params(("id" = uuid::Uuid, Path, description = "Comment id")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated comment", body = Comment),
        (status = 403, description = "Not the owner", body = MessageResponse),
        (status = 404, description = "Comment not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_comment(
    identity: Identity,
    State(state): State<AppState>,
    IdParam(id): IdParam,
    Json(payload): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    payload.validate()?;

    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(comment_not_found)?;
    state
        .ownership
        .ensure(&identity, comment.user_id, Mutation::Update)?;

    let updated = state
        .repo
        .update_comment(id, payload.text.trim().to_string())
        .await?
        .ok_or_else(comment_not_found)?;
    Ok(Json(updated))
}

/// delete_comment
///
/// [Authenticated Route] Owner or admin.
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    tag = "comments",
    params(("id" = uuid::Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = DeletedResponse),
        (status = 403, description = "Neither the owner nor an admin", body = MessageResponse),
        (status = 404, description = "Comment not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_comment(
    identity: Identity,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<DeletedResponse>> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(comment_not_found)?;
    state
        .ownership
        .ensure(&identity, comment.user_id, Mutation::Delete)?;

    state.repo.delete_comment(id).await?;
    tracing::info!(comment_id = %id, deleted_by = %identity.subject_id, "comment deleted");
    Ok(Json(DeletedResponse {
        message: "Comment deleted successfully".to_string(),
        id,
    }))
}

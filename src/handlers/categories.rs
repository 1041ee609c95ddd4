use axum::{Json, extract::State, http::StatusCode};

use super::IdParam;
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{Category, CreateCategoryRequest, DeletedResponse, MessageResponse},
    policy::AdminOnly,
    validation::Validate,
};

/// create_category
///
/// [Admin Route] The creating admin is recorded as the category's `user_id`.
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 403, description = "Not an admin", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    payload.validate()?;
    let category = state
        .repo
        .create_category(admin.subject_id, payload.title.trim().to_string())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories().await?))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = uuid::Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted", body = DeletedResponse),
        (status = 404, description = "Category not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> ApiResult<Json<DeletedResponse>> {
    if !state.repo.delete_category(id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }
    Ok(Json(DeletedResponse {
        message: "Category deleted successfully".to_string(),
        id,
    }))
}

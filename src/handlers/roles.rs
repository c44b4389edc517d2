use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    entities::role,
    errors::ServiceError,
    services::roles::{CreateRoleRequest, UpdateRoleRequest},
    ApiResponse, ApiResult, AppState,
};

pub async fn create_role(
    State(state): State<AppState>,
    Json(request): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<role::Model>>), ServiceError> {
    let role = state.role_service.create_role(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(role))))
}

pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<role::Model> {
    let role = state.role_service.get_role(id).await?;
    Ok(Json(ApiResponse::success(role)))
}

pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Vec<role::Model>> {
    let roles = state.role_service.list_roles().await?;
    Ok(Json(ApiResponse::success(roles)))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<role::Model> {
    let role = state.role_service.update_role(id, request).await?;
    Ok(Json(ApiResponse::success(role)))
}

pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.role_service.delete_role(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::users::{
        LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest, UpdateUserRequest,
        UserListResponse, UserResponse,
    },
    ApiResponse, ApiResult, AppState, ListQuery,
};

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ServiceError> {
    let user = state.user_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = state.user_service.login(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<UserResponse> {
    let user = state.user_service.get_user(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<UserResponse> {
    let user = state
        .user_service
        .update_profile(auth_user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserResponse> {
    let user = state.user_service.get_user(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<UserListResponse> {
    let users = state
        .user_service
        .list_users(query.page, query.limit, query.search)
        .await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    let user = state.user_service.update_user(id, request).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.user_service.delete_user(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

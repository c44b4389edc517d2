use axum::{extract::State, Extension, Json};

use crate::{
    auth::AuthUser, entities::notification, ApiResponse, ApiResult, AppState,
};

pub async fn list_all(State(state): State<AppState>) -> ApiResult<Vec<notification::Model>> {
    let notifications = state.notification_service.list_all().await?;
    Ok(Json(ApiResponse::success(notifications)))
}

/// The caller's notifications. Returned unread rows are marked read.
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<notification::Model>> {
    let notifications = state
        .notification_service
        .list_for_user(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(notifications)))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<serde_json::Value> {
    let count = state
        .notification_service
        .unread_count(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "unread": count }),
    )))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<serde_json::Value> {
    let marked = state
        .notification_service
        .mark_all_read(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "marked_read": marked }),
    )))
}

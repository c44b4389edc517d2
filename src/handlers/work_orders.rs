use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::DateRangeQuery,
    services::work_orders::{
        CreateWorkOrderRequest, SetStatusRequest, UpdateWorkOrderRequest, WorkOrderListResponse,
        WorkOrderResponse,
    },
    ApiResponse, ApiResult, AppState, ListQuery,
};

pub async fn create_work_order(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WorkOrderResponse>>), ServiceError> {
    let work_order = state.work_order_service.create_work_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(work_order))))
}

pub async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<WorkOrderResponse> {
    let work_order = state.work_order_service.get_work_order(id).await?;
    Ok(Json(ApiResponse::success(work_order)))
}

pub async fn list_work_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<WorkOrderListResponse> {
    let work_orders = state
        .work_order_service
        .list_work_orders(query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(work_orders)))
}

pub async fn update_work_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWorkOrderRequest>,
) -> ApiResult<WorkOrderResponse> {
    let work_order = state
        .work_order_service
        .update_work_order(id, request)
        .await?;
    Ok(Json(ApiResponse::success(work_order)))
}

/// Status change; crossing into Complete credits the finished good.
pub async fn set_work_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> ApiResult<WorkOrderResponse> {
    let work_order = state.work_order_service.set_status(id, request).await?;
    Ok(Json(ApiResponse::success(work_order)))
}

pub async fn delete_work_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.work_order_service.delete_work_order(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

pub async fn work_order_report(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Vec<WorkOrderResponse>> {
    let work_orders = state
        .work_order_service
        .work_order_report(range.from, range.to)
        .await?;
    Ok(Json(ApiResponse::success(work_orders)))
}

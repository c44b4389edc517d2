use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    entities::{inventory_history, product},
    handlers::DateRangeQuery,
    services::inventory::{AdjustStockRequest, HistoryEntryResponse, HistoryListResponse},
    ApiResponse, ApiResult, AppState, ListQuery,
};

/// Manual stock adjustment; the ledger row is written in the same
/// transaction as the stock change.
pub async fn adjust_stock(
    State(state): State<AppState>,
    Json(request): Json<AdjustStockRequest>,
) -> ApiResult<product::Model> {
    let product = state.inventory_service.adjust_stock(request).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<HistoryListResponse> {
    let history = state
        .inventory_service
        .list_history(query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

pub async fn get_history_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<inventory_history::Model> {
    let entry = state.inventory_service.get_history_entry(id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

pub async fn history_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Vec<HistoryEntryResponse>> {
    let entries = state
        .inventory_service
        .history_for_product(product_id)
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub async fn history_report(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Vec<HistoryEntryResponse>> {
    let entries = state
        .inventory_service
        .history_report(range.from, range.to)
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

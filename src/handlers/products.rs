use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    entities::product::{self, ProductType},
    errors::ServiceError,
    handlers::DateRangeQuery,
    services::products::{
        CreateProductRequest, ProductListResponse, ProductSalesRow, UpdateProductRequest,
    },
    ApiResponse, ApiResult, AppState, ListQuery,
};

pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let product = state.product_service.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.product_service.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ProductListResponse> {
    let products = state
        .product_service
        .list_products(query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn list_raw_materials(
    State(state): State<AppState>,
) -> ApiResult<Vec<product::Model>> {
    let products = state
        .product_service
        .list_by_type(ProductType::RawMaterial)
        .await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn list_ready_goods(State(state): State<AppState>) -> ApiResult<Vec<product::Model>> {
    let products = state
        .product_service
        .list_by_type(ProductType::ReadyGood)
        .await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    let product = state.product_service.update_product(id, request).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.product_service.delete_product(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

pub async fn most_selling_products(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Vec<ProductSalesRow>> {
    let rows = state
        .product_service
        .most_selling_products(range.from, range.to)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

mod common;

use axum::http::StatusCode;
use common::{admin_permissions, TestApp};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;
use wms_api::entities::{inventory_history, product};

async fn setup() -> (TestApp, String, product::Model) {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;
    let (_, token) = app.seed_user("admin@example.com", "admin").await;
    let fabric = app
        .seed_product("FAB-001", "Cotton fabric", product::ProductType::RawMaterial, 100)
        .await;
    (app, token, fabric)
}

#[tokio::test]
async fn adjustment_changes_stock_and_writes_a_ledger_row() {
    let (app, token, fabric) = setup().await;

    let (status, body) = app
        .post(
            "/api/v1/inventory/adjust",
            &token,
            json!({
                "product_id": fabric.id,
                "quantity_change": -30,
                "note": "Damaged in storage"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock_quantity"], 70);

    let rows = inventory_history::Entity::find()
        .filter(inventory_history::Column::ProductId.eq(fabric.id))
        .all(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity_change, -30);
    assert_eq!(rows[0].note.as_deref(), Some("Damaged in storage"));
}

#[tokio::test]
async fn stock_is_allowed_to_go_negative() {
    let (app, token, fabric) = setup().await;

    let (status, body) = app
        .post(
            "/api/v1/inventory/adjust",
            &token,
            json!({
                "product_id": fabric.id,
                "quantity_change": -150,
                "note": "Stocktake correction"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock_quantity"], -50);
}

#[tokio::test]
async fn zero_delta_is_rejected() {
    let (app, token, fabric) = setup().await;

    let (status, _) = app
        .post(
            "/api/v1/inventory/adjust",
            &token,
            json!({
                "product_id": fabric.id,
                "quantity_change": 0,
                "note": "no-op"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn adjusting_an_unknown_product_is_not_found() {
    let (app, token, _) = setup().await;

    let (status, _) = app
        .post(
            "/api/v1/inventory/adjust",
            &token,
            json!({
                "product_id": Uuid::new_v4(),
                "quantity_change": 10,
                "note": "phantom"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_endpoints_return_ledger_rows_with_product_names() {
    let (app, token, fabric) = setup().await;

    for (delta, note) in [(25, "Goods received"), (-5, "Sample cut")] {
        app.post(
            "/api/v1/inventory/adjust",
            &token,
            json!({ "product_id": fabric.id, "quantity_change": delta, "note": note }),
        )
        .await;
    }

    let (status, body) = app.get("/api/v1/inventory/history", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["product_name"], "Cotton fabric");

    let (status, body) = app
        .get(
            &format!("/api/v1/inventory/products/{}/history", fabric.id),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .get(
            &format!("/api/v1/inventory/products/{}/history", Uuid::new_v4()),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inventory_report_filters_by_date_range() {
    let (app, token, fabric) = setup().await;

    app.post(
        "/api/v1/inventory/adjust",
        &token,
        json!({ "product_id": fabric.id, "quantity_change": 40, "note": "Goods received" }),
    )
    .await;

    // A range that covers now
    let (status, body) = app
        .get(
            "/api/v1/reports/inventory?from=2020-01-01T00:00:00Z&to=2030-01-01T00:00:00Z",
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // A range entirely in the past
    let (status, body) = app
        .get(
            "/api/v1/reports/inventory?from=2020-01-01T00:00:00Z&to=2020-12-31T00:00:00Z",
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    // Inverted range
    let (status, _) = app
        .get(
            "/api/v1/reports/inventory?from=2030-01-01T00:00:00Z&to=2020-01-01T00:00:00Z",
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

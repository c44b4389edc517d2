mod common;

use axum::http::StatusCode;
use common::{admin_permissions, TestApp};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;
use wms_api::entities::{inventory_history, product};

async fn setup() -> (TestApp, String, product::Model, product::Model) {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;
    let (_, token) = app.seed_user("admin@example.com", "admin").await;
    let fabric = app
        .seed_product("FAB-001", "Cotton fabric", product::ProductType::RawMaterial, 100)
        .await;
    let shirt = app
        .seed_product("SHIRT-001", "Blue shirt", product::ProductType::ReadyGood, 0)
        .await;
    (app, token, fabric, shirt)
}

fn work_order_body(product_id: Uuid, material_id: Uuid, quantity: i32) -> serde_json::Value {
    json!({
        "product_id": product_id,
        "quantity": quantity,
        "delivery_date": "2026-09-15T00:00:00Z",
        "raw_materials": [
            { "product_id": material_id, "quantity": 2 }
        ],
        "notes": "rush job"
    })
}

async fn stock_of(app: &TestApp, id: Uuid) -> i32 {
    product::Entity::find_by_id(id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap()
        .stock_quantity
}

async fn history_rows(app: &TestApp, id: Uuid) -> Vec<inventory_history::Model> {
    inventory_history::Entity::find()
        .filter(inventory_history::Column::ProductId.eq(id))
        .all(app.state.db.as_ref())
        .await
        .unwrap()
}

#[tokio::test]
async fn creation_records_the_plan_but_moves_no_stock() {
    let (app, token, fabric, shirt) = setup().await;

    let (status, body) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, fabric.id, 10),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "Pending");
    assert_eq!(body["data"]["product_name"], "Blue shirt");

    assert_eq!(stock_of(&app, shirt.id).await, 0);
    assert_eq!(stock_of(&app, fabric.id).await, 100);
    assert!(history_rows(&app, shirt.id).await.is_empty());
    assert!(history_rows(&app, fabric.id).await.is_empty());
}

#[tokio::test]
async fn completion_credits_stock_exactly_once() {
    let (app, token, fabric, shirt) = setup().await;

    let (_, body) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, fabric.id, 10),
        )
        .await;
    let wo_id = body["data"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/v1/work-orders/{wo_id}/status");

    let (status, body) = app
        .put(&status_uri, &token, json!({ "status": "Complete" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Complete");
    assert_eq!(stock_of(&app, shirt.id).await, 10);

    let rows = history_rows(&app, shirt.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity_change, 10);
    let note = rows[0].note.as_deref().unwrap();
    assert!(note.contains(&wo_id));
    assert!(note.contains("for product Blue shirt completed"));

    // Re-submitting Complete is a stock no-op.
    let (status, _) = app
        .put(&status_uri, &token, json!({ "status": "Complete" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock_of(&app, shirt.id).await, 10);
    assert_eq!(history_rows(&app, shirt.id).await.len(), 1);
}

#[tokio::test]
async fn reopening_a_completed_work_order_does_not_reverse_the_credit() {
    let (app, token, fabric, shirt) = setup().await;

    let (_, body) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, fabric.id, 10),
        )
        .await;
    let wo_id = body["data"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/v1/work-orders/{wo_id}/status");

    app.put(&status_uri, &token, json!({ "status": "Complete" }))
        .await;
    let (status, _) = app
        .put(&status_uri, &token, json!({ "status": "Cutting" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(stock_of(&app, shirt.id).await, 10);
    assert_eq!(history_rows(&app, shirt.id).await.len(), 1);

    // Crossing the completion edge again credits again.
    app.put(&status_uri, &token, json!({ "status": "Complete" }))
        .await;
    assert_eq!(stock_of(&app, shirt.id).await, 20);
    assert_eq!(history_rows(&app, shirt.id).await.len(), 2);
}

#[tokio::test]
async fn stages_cannot_be_skipped() {
    let (app, token, fabric, shirt) = setup().await;

    let (_, body) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, fabric.id, 5),
        )
        .await;
    let wo_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(
            &format!("/api/v1/work-orders/{wo_id}/status"),
            &token,
            json!({ "status": "Sewing" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            &format!("/api/v1/work-orders/{wo_id}/status"),
            &token,
            json!({ "status": "Started" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn embedded_status_changes_use_the_same_completion_edge() {
    let (app, token, fabric, shirt) = setup().await;

    let (_, body) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, fabric.id, 10),
        )
        .await;
    let wo_id = body["data"]["id"].as_str().unwrap().to_string();

    // General update carrying a status change must hit the guarded edge.
    let (status, _) = app
        .put(
            &format!("/api/v1/work-orders/{wo_id}"),
            &token,
            json!({ "notes": "done early", "status": "Complete" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock_of(&app, shirt.id).await, 10);
    assert_eq!(history_rows(&app, shirt.id).await.len(), 1);
}

#[tokio::test]
async fn deletion_always_debits_the_finished_good() {
    let (app, token, fabric, shirt) = setup().await;

    // Delete while still Pending: stock goes negative, ledger records it.
    let (_, body) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, fabric.id, 10),
        )
        .await;
    let wo_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .delete(&format!("/api/v1/work-orders/{wo_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(stock_of(&app, shirt.id).await, -10);
    let rows = history_rows(&app, shirt.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity_change, -10);
    assert!(rows[0]
        .note
        .as_deref()
        .unwrap()
        .contains(&format!("Work order {wo_id} deleted")));

    let (status, _) = app
        .get(&format!("/api/v1/work-orders/{wo_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn raw_materials_must_exist_and_be_raw() {
    let (app, token, _, shirt) = setup().await;

    // Unknown raw material id
    let (status, _) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, Uuid::new_v4(), 10),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A ready good cannot be used as a raw material
    let (status, _) = app
        .post(
            "/api/v1/work-orders",
            &token,
            work_order_body(shirt.id, shirt.id, 10),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

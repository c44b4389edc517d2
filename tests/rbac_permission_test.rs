mod common;

use axum::http::StatusCode;
use common::{admin_permissions, TestApp};
use serde_json::json;

#[tokio::test]
async fn read_only_roles_can_read_but_not_write() {
    let app = TestApp::new().await;
    app.seed_role("order_viewer", json!({ "ORDER": ["read"] }))
        .await;
    let (_, token) = app.seed_user("viewer@example.com", "order_viewer").await;

    let (status, _) = app.get("/api/v1/orders", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/orders",
            &token,
            json!({
                "user_id": uuid::Uuid::new_v4(),
                "delivery_date": "2026-09-01T00:00:00Z",
                "shipping_address": "1 Warehouse Way",
                "items": [
                    { "product_id": uuid::Uuid::new_v4(), "quantity": 1, "unit_price": "1.00" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // No grant at all for other resources
    let (status, _) = app.get("/api/v1/products", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_roles_are_forbidden() {
    let app = TestApp::new().await;
    // User points at a role that was never created.
    let (_, token) = app.seed_user("ghost@example.com", "missing_role").await;

    let (status, _) = app.get("/api/v1/orders", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn garbage_tokens_are_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/orders", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(axum::http::Method::GET, "/api/v1/orders", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_crud_requires_the_permission_resource() {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;
    app.seed_role("clerk", json!({ "ORDER": ["read"] })).await;
    let (_, admin_token) = app.seed_user("admin@example.com", "admin").await;
    let (_, clerk_token) = app.seed_user("clerk@example.com", "clerk").await;

    let (status, body) = app
        .post(
            "/api/v1/roles",
            &admin_token,
            json!({
                "name": "picker",
                "permissions": { "INVENTORY": ["read"] }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let role_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.get("/api/v1/roles", &clerk_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(
            &format!("/api/v1/roles/{role_id}"),
            &admin_token,
            json!({ "permissions": { "INVENTORY": ["read", "update"] } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["permissions"]["INVENTORY"][1], "update");

    let (status, _) = app
        .delete(&format!("/api/v1/roles/{role_id}"), &admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_permission_maps_are_rejected() {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;
    let (_, token) = app.seed_user("admin@example.com", "admin").await;

    // Actions must be an array of strings, not a scalar.
    let (status, _) = app
        .post(
            "/api/v1/roles",
            &token,
            json!({ "name": "broken", "permissions": { "ORDER": "read" } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/roles",
            &token,
            json!({ "name": "broken", "permissions": ["ORDER.read"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_role_names_conflict() {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;
    let (_, token) = app.seed_user("admin@example.com", "admin").await;

    let body = json!({ "name": "packer", "permissions": { "ORDER": ["read"] } });
    let (status, _) = app.post("/api/v1/roles", &token, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.post("/api/v1/roles", &token, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn profile_updates_cannot_escalate_the_role() {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;
    app.seed_role("clerk", json!({ "ORDER": ["read"] })).await;
    let (_, token) = app.seed_user("clerk@example.com", "clerk").await;

    // A submitted "role" key is not part of the profile shape and is dropped.
    let (status, body) = app
        .put(
            "/api/v1/profile",
            &token,
            json!({ "first_name": "Casey", "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Casey");
    assert_eq!(body["data"]["role"], "clerk");

    // Still a clerk: no grant for products.
    let (status, _) = app.get("/api/v1/products", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_returns_a_usable_token() {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;
    app.seed_user("admin@example.com", "admin").await;

    let (status, body) = app
        .request(
            axum::http::Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "admin@example.com",
                "password": "correct-horse-battery"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = app.get("/api/v1/orders", &token).await;
    assert_eq!(status, StatusCode::OK);

    // Wrong password gets the same generic error as an unknown email.
    let (status, body) = app
        .request(
            axum::http::Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "admin@example.com",
                "password": "wrong"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid email or password"));
}

#[tokio::test]
async fn registration_creates_a_login_capable_user() {
    let app = TestApp::new().await;
    app.seed_role("admin", admin_permissions()).await;

    let (status, body) = app
        .request(
            axum::http::Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "first_name": "Pat",
                "last_name": "Lee",
                "email": "pat@example.com",
                "password": "a-long-password",
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = app
        .request(
            axum::http::Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "first_name": "Pat",
                "last_name": "Lee",
                "email": "pat@example.com",
                "password": "a-long-password",
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

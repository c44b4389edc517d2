use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use wms_api::{
    app,
    config::AppConfig,
    db,
    entities::{product, role, user},
    AppState,
};

/// Test harness: full application router over a fresh in-memory SQLite
/// database with the real migrations applied.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_needs_64_chars_aaaaaaaa".to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::connect_and_migrate(&cfg)
            .await
            .expect("failed to create test database");

        let (state, event_rx) = AppState::new(pool, cfg);
        let event_task = tokio::spawn(wms_api::events::process_events(event_rx));

        Self {
            router: app(state.clone()),
            state,
            _event_task: event_task,
        }
    }

    /// Insert a role with the given permissions map.
    pub async fn seed_role(&self, name: &str, permissions: Value) -> role::Model {
        role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            permissions: Set(permissions),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("failed to seed role")
    }

    /// Insert a user with the given role and return the model plus a valid
    /// bearer token for it.
    pub async fn seed_user(&self, email: &str, role_name: &str) -> (user::Model, String) {
        let password_hash = self
            .state
            .auth_service
            .hash_password("correct-horse-battery")
            .expect("failed to hash password");

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            mobile: Set(None),
            city: Set(None),
            role: Set(role_name.to_string()),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("failed to seed user");

        let token = self
            .state
            .auth_service
            .generate_token(&user)
            .expect("failed to generate token")
            .access_token;

        (user, token)
    }

    pub async fn seed_product(
        &self,
        sku: &str,
        name: &str,
        product_type: product::ProductType,
        stock_quantity: i32,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(rust_decimal::Decimal::new(1999, 2)),
            stock_quantity: Set(stock_quantity),
            product_type: Set(product_type),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("failed to seed product")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("failed to build request"),
            None => builder.body(Body::empty()).expect("failed to build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}

/// The full-access permissions map used by most tests.
pub fn admin_permissions() -> Value {
    serde_json::json!({
        "ORDER": ["create", "read", "update", "delete"],
        "PRODUCT": ["create", "read", "update", "delete"],
        "WORKORDER": ["create", "read", "update", "delete"],
        "INVENTORY": ["read", "update"],
        "USER": ["read", "update", "delete"],
        "PERMISSION": ["create", "read", "update", "delete"],
        "REPORT": ["read"]
    })
}

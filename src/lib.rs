//! Warehouse and manufacturing management API.
//!
//! Orders, production work orders, products and a paired inventory ledger,
//! behind JWT authentication with role-permission authorization.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::auth::{perms, AuthConfig, AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::email::{EmailSender, HttpEmailSender, NoopEmailSender};
use crate::errors::ServiceError;
use crate::events::Event;
use crate::services::{
    inventory::InventoryService, notifications::NotificationService, orders::OrderService,
    products::ProductService, roles::RoleService, users::UserService,
    work_orders::WorkOrderService,
};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub auth_service: Arc<AuthService>,
    pub order_service: OrderService,
    pub work_order_service: WorkOrderService,
    pub product_service: ProductService,
    pub inventory_service: InventoryService,
    pub notification_service: NotificationService,
    pub user_service: UserService,
    pub role_service: RoleService,
}

impl AppState {
    /// Wires up services against the given database. Returns the receiver
    /// side of the event channel for [`events::process_events`].
    pub fn new(db: Arc<DbPool>, config: AppConfig) -> (Self, mpsc::Receiver<Event>) {
        let (event_sender, event_receiver) = events::channel(256);
        let event_sender = Arc::new(event_sender);

        let auth_service = Arc::new(AuthService::new(
            AuthConfig {
                jwt_secret: config.jwt_secret.clone(),
                jwt_issuer: config.auth_issuer.clone(),
                jwt_audience: config.auth_audience.clone(),
                token_lifetime_secs: config.jwt_expiration,
            },
            db.clone(),
        ));

        let email_sender: Arc<dyn EmailSender> = match &config.email_api_url {
            Some(url) => match HttpEmailSender::new(url.clone(), config.email_api_key.clone()) {
                Ok(sender) => Arc::new(sender),
                Err(e) => {
                    tracing::warn!(error = %e, "Falling back to no-op email sender");
                    Arc::new(NoopEmailSender)
                }
            },
            None => Arc::new(NoopEmailSender),
        };

        let state = Self {
            order_service: OrderService::new(
                db.clone(),
                Some(event_sender.clone()),
                email_sender,
                config.email_from.clone(),
            ),
            work_order_service: WorkOrderService::new(db.clone(), Some(event_sender.clone())),
            product_service: ProductService::new(db.clone()),
            inventory_service: InventoryService::new(db.clone(), Some(event_sender.clone())),
            notification_service: NotificationService::new(db.clone()),
            user_service: UserService::new(db.clone(), auth_service.clone(), Some(event_sender)),
            role_service: RoleService::new(db.clone()),
            auth_service,
            db,
            config,
        };

        (state, event_receiver)
    }
}

/// Common query parameters for list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Uniform success envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

/// Standard API result type for JSON responses.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ServiceError>;

/// All `/api/v1` routes, permission-gated per resource and action.
pub fn api_v1_routes() -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::users::register))
        .route("/auth/login", post(handlers::users::login));

    let profile = Router::new()
        .route("/profile", get(handlers::users::profile))
        .route("/profile", put(handlers::users::update_profile))
        .with_auth();

    let orders_read = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .with_permission(perms::ORDER_READ);
    let orders_create = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .with_permission(perms::ORDER_CREATE);
    let orders_update = Router::new()
        .route("/orders/{id}", put(handlers::orders::update_order))
        .with_permission(perms::ORDER_UPDATE);
    let orders_delete = Router::new()
        .route("/orders/{id}", delete(handlers::orders::delete_order))
        .with_permission(perms::ORDER_DELETE);

    let products_read = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/{id}", get(handlers::products::get_product))
        .route(
            "/products/raw-materials",
            get(handlers::products::list_raw_materials),
        )
        .route(
            "/products/ready-goods",
            get(handlers::products::list_ready_goods),
        )
        .with_permission(perms::PRODUCT_READ);
    let products_create = Router::new()
        .route("/products", post(handlers::products::create_product))
        .with_permission(perms::PRODUCT_CREATE);
    let products_update = Router::new()
        .route("/products/{id}", put(handlers::products::update_product))
        .with_permission(perms::PRODUCT_UPDATE);
    let products_delete = Router::new()
        .route("/products/{id}", delete(handlers::products::delete_product))
        .with_permission(perms::PRODUCT_DELETE);

    let work_orders_read = Router::new()
        .route("/work-orders", get(handlers::work_orders::list_work_orders))
        .route(
            "/work-orders/{id}",
            get(handlers::work_orders::get_work_order),
        )
        .with_permission(perms::WORKORDER_READ);
    let work_orders_create = Router::new()
        .route(
            "/work-orders",
            post(handlers::work_orders::create_work_order),
        )
        .with_permission(perms::WORKORDER_CREATE);
    let work_orders_update = Router::new()
        .route(
            "/work-orders/{id}",
            put(handlers::work_orders::update_work_order),
        )
        .route(
            "/work-orders/{id}/status",
            put(handlers::work_orders::set_work_order_status),
        )
        .with_permission(perms::WORKORDER_UPDATE);
    let work_orders_delete = Router::new()
        .route(
            "/work-orders/{id}",
            delete(handlers::work_orders::delete_work_order),
        )
        .with_permission(perms::WORKORDER_DELETE);

    let inventory_read = Router::new()
        .route("/inventory/history", get(handlers::inventory::list_history))
        .route(
            "/inventory/history/{id}",
            get(handlers::inventory::get_history_entry),
        )
        .route(
            "/inventory/products/{id}/history",
            get(handlers::inventory::history_for_product),
        )
        .with_permission(perms::INVENTORY_READ);
    let inventory_update = Router::new()
        .route("/inventory/adjust", post(handlers::inventory::adjust_stock))
        .with_permission(perms::INVENTORY_UPDATE);

    let notifications = Router::new()
        .route("/notifications", get(handlers::notifications::list_all))
        .route("/notifications/mine", get(handlers::notifications::list_mine))
        .route(
            "/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route(
            "/notifications/mark-all-read",
            post(handlers::notifications::mark_all_read),
        )
        .with_auth();

    let users_read = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route("/users/{id}", get(handlers::users::get_user))
        .with_permission(perms::USER_READ);
    let users_update = Router::new()
        .route("/users/{id}", put(handlers::users::update_user))
        .with_permission(perms::USER_UPDATE);
    let users_delete = Router::new()
        .route("/users/{id}", delete(handlers::users::delete_user))
        .with_permission(perms::USER_DELETE);

    let roles_read = Router::new()
        .route("/roles", get(handlers::roles::list_roles))
        .route("/roles/{id}", get(handlers::roles::get_role))
        .with_permission(perms::PERMISSION_READ);
    let roles_create = Router::new()
        .route("/roles", post(handlers::roles::create_role))
        .with_permission(perms::PERMISSION_CREATE);
    let roles_update = Router::new()
        .route("/roles/{id}", put(handlers::roles::update_role))
        .with_permission(perms::PERMISSION_UPDATE);
    let roles_delete = Router::new()
        .route("/roles/{id}", delete(handlers::roles::delete_role))
        .with_permission(perms::PERMISSION_DELETE);

    let reports = Router::new()
        .route("/reports/orders", get(handlers::orders::order_report))
        .route(
            "/reports/work-orders",
            get(handlers::work_orders::work_order_report),
        )
        .route(
            "/reports/inventory",
            get(handlers::inventory::history_report),
        )
        .route(
            "/reports/most-selling-products",
            get(handlers::products::most_selling_products),
        )
        .with_permission(perms::REPORT_READ);

    Router::new()
        .route("/status", get(api_status))
        .merge(auth_routes)
        .merge(profile)
        .merge(orders_read)
        .merge(orders_create)
        .merge(orders_update)
        .merge(orders_delete)
        .merge(products_read)
        .merge(products_create)
        .merge(products_update)
        .merge(products_delete)
        .merge(work_orders_read)
        .merge(work_orders_create)
        .merge(work_orders_update)
        .merge(work_orders_delete)
        .merge(inventory_read)
        .merge(inventory_update)
        .merge(notifications)
        .merge(users_read)
        .merge(users_update)
        .merge(users_delete)
        .merge(roles_read)
        .merge(roles_create)
        .merge(roles_update)
        .merge(roles_delete)
        .merge(reports)
}

/// Assemble the full application router with middleware layers.
pub fn app(state: AppState) -> Router {
    let auth_service = state.auth_service.clone();
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(Extension(auth_service))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Explicit origins from config when set, permissive otherwise.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    use tower_http::cors::Any;

    let origins: Vec<http::HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|origin| {
            let trimmed = origin.trim();
            if trimmed.is_empty() {
                None
            } else {
                http::HeaderValue::from_str(trimmed).ok()
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn api_status() -> ApiResult<Value> {
    Ok(Json(ApiResponse::success(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Ok(Json(ApiResponse::success(json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))))
}

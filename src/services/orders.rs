use crate::{
    db::DbPool,
    email::{order_status_body, EmailMessage, EmailSender},
    entities::notification::{self, NotificationStatus},
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    entities::user::Entity as UserEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::apply_stock_change,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub delivery_date: DateTime<Utc>,
    #[validate(length(min = 1, max = 500, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, message = "At least one order item is required"))]
    pub items: Vec<OrderItemInput>,
}

/// Full-state update; the submitted item list replaces the stored one and
/// `user_id` replaces the owner.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    pub user_id: Uuid,
    /// Status name as stored, e.g. "Pending", "On Process", "Delivered"
    pub status: String,
    pub delivery_date: DateTime<Utc>,
    #[validate(length(min = 1, max = 500, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, message = "At least one order item is required"))]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_date: DateTime<Utc>,
    pub shipping_address: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

fn validate_items(items: &[OrderItemInput]) -> Result<(), ServiceError> {
    for item in items {
        if item.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Item quantity must be positive".to_string(),
            ));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Item unit price must not be negative".to_string(),
            ));
        }
    }
    Ok(())
}

/// Service for orders, including the delivery stock decrement.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    email_sender: Arc<dyn EmailSender>,
    email_from: String,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        email_sender: Arc<dyn EmailSender>,
        email_from: String,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            email_sender,
            email_from,
        }
    }

    /// Creating an order never touches stock; only delivery does.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        validate_items(&request.items)?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        for item in &request.items {
            ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;
        }

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let total_amount = insert_items(&txn, order_id, &request.items, now).await?;

        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(request.user_id),
            delivery_date: Set(request.delivery_date),
            shipping_address: Set(request.shipping_address),
            total_amount: Set(total_amount),
            status: Set(OrderStatus::Pending),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id = %order_id, "Order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order created event");
            }
        }

        self.to_response(order).await
    }

    /// Full-state order update. In one transaction: checks the status
    /// transition, charges inventory for each submitted item when the order
    /// crosses into Delivered, replaces the item list, updates the scalar
    /// fields (including the owner) and writes an unread notification for
    /// the owner. The notification is written on every successful update,
    /// same-status resubmissions included; the status email goes out only
    /// after the commit.
    #[instrument(skip(self, request), fields(order_id = %id))]
    pub async fn update_order(
        &self,
        id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        validate_items(&request.items)?;
        let new_status = parse_status(&request.status)?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order update");
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot transition order from {old_status:?} to {new_status:?}"
            )));
        }

        // The stock decrement fires exactly on the edge into Delivered, and
        // is charged against the submitted item list.
        if old_status != OrderStatus::Delivered && new_status == OrderStatus::Delivered {
            for item in &request.items {
                let product = ProductEntity::find_by_id(item.product_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", item.product_id))
                    })?;
                apply_stock_change(
                    &txn,
                    item.product_id,
                    -item.quantity,
                    format!("Order {id} delivered for product {}", product.name),
                )
                .await?;
            }
        }

        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        let now = Utc::now();
        let total_amount = insert_items(&txn, id, &request.items, now).await?;

        let mut active: order::ActiveModel = order.into();
        active.user_id = Set(request.user_id);
        active.status = Set(new_status);
        active.delivery_date = Set(request.delivery_date);
        active.shipping_address = Set(request.shipping_address);
        active.total_amount = Set(total_amount);
        let updated = active.update(&txn).await?;

        insert_status_notification(&txn, request.user_id, id, new_status, now).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %id, "Failed to commit order update transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %id, status = ?new_status, "Order updated");

        self.send_status_email(&updated, &request.items).await;

        if old_status != new_status {
            if let Some(event_sender) = &self.event_sender {
                if let Err(e) = event_sender
                    .send(Event::OrderStatusChanged {
                        order_id: id,
                        old_status: format!("{old_status:?}"),
                        new_status: format!("{new_status:?}"),
                    })
                    .await
                {
                    warn!(error = %e, order_id = %id, "Failed to send order status event");
                }
            }
        }

        self.to_response(updated).await
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))?;
        self.to_response(order).await
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.to_response(order).await?);
        }

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }

    /// Deletes the order and its items. No stock effect: delivered stock
    /// stays issued, the ledger already has the record.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::DatabaseError)?;

        let order = OrderEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))?;

        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(order.id).exec(&txn).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(order_id = %id, "Order deleted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderDeleted(id)).await {
                warn!(error = %e, order_id = %id, "Failed to send order deleted event");
            }
        }

        Ok(())
    }

    /// Orders created within a date range, newest first.
    #[instrument(skip(self))]
    pub async fn order_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "from must not be after to".to_string(),
            ));
        }

        let orders = OrderEntity::find()
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lte(to))
            .order_by_desc(order::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.to_response(order).await?);
        }
        Ok(responses)
    }

    /// Best-effort: logged on failure, never surfaced to the caller.
    async fn send_status_email(&self, order: &order::Model, items: &[OrderItemInput]) {
        let owner = match UserEntity::find_by_id(order.user_id)
            .one(self.db_pool.as_ref())
            .await
        {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                warn!(order_id = %order.id, "Order owner not found, skipping status email");
                return;
            }
            Err(e) => {
                warn!(error = %e, order_id = %order.id, "Failed to load order owner for email");
                return;
            }
        };

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let name = ProductEntity::find_by_id(item.product_id)
                .one(self.db_pool.as_ref())
                .await
                .ok()
                .flatten()
                .map(|p| p.name)
                .unwrap_or_else(|| item.product_id.to_string());
            lines.push((name, item.quantity));
        }

        let status = status_label(order.status);
        let message = EmailMessage {
            to: owner.email,
            from: self.email_from.clone(),
            subject: format!("Order Status Updated: {status}"),
            body: order_status_body(order.id, &status, &lines),
        };

        if let Err(e) = self.email_sender.send(message).await {
            warn!(error = %e, order_id = %order.id, "Failed to send order status email");
        }
    }

    async fn to_response(&self, order: order::Model) -> Result<OrderResponse, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(self.db_pool.as_ref())
            .await?;

        let mut item_responses = Vec::with_capacity(items.len());
        for item in items {
            let product_name = ProductEntity::find_by_id(item.product_id)
                .one(self.db_pool.as_ref())
                .await?
                .map(|p| p.name);
            item_responses.push(OrderItemResponse {
                id: item.id,
                product_id: item.product_id,
                product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
            });
        }

        Ok(OrderResponse {
            id: order.id,
            user_id: order.user_id,
            delivery_date: order.delivery_date,
            shipping_address: order.shipping_address,
            total_amount: order.total_amount,
            status: order.status,
            items: item_responses,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

/// Inserts the submitted items for an order, computing each line total, and
/// returns the order total.
async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    items: &[OrderItemInput],
    now: DateTime<Utc>,
) -> Result<Decimal, ServiceError> {
    let mut total = Decimal::ZERO;
    for item in items {
        let line_total = item.unit_price * Decimal::from(item.quantity);
        total += line_total;
        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            total_price: Set(line_total),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }
    Ok(total)
}

async fn insert_status_notification<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_id: Uuid,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set(format!(
            "Order {order_id} status changed to {}",
            status_label(status)
        )),
        status: Set(NotificationStatus::Unread),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(())
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    use sea_orm::ActiveEnum;
    OrderStatus::try_from_value(&raw.to_string())
        .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status: {raw}")))
}

fn status_label(status: OrderStatus) -> String {
    use sea_orm::ActiveEnum;
    status.to_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn item_validation_rejects_bad_quantities_and_prices() {
        let bad_quantity = vec![OrderItemInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price: dec!(10.00),
        }];
        assert!(validate_items(&bad_quantity).is_err());

        let bad_price = vec![OrderItemInput {
            product_id: Uuid::new_v4(),
            quantity: 1,
            unit_price: dec!(-1.00),
        }];
        assert!(validate_items(&bad_price).is_err());

        let good = vec![OrderItemInput {
            product_id: Uuid::new_v4(),
            quantity: 2,
            unit_price: dec!(4.50),
        }];
        assert!(validate_items(&good).is_ok());
    }

    #[test]
    fn status_labels_use_the_stored_strings() {
        assert_eq!(status_label(OrderStatus::OnProcess), "On Process");
        assert_eq!(status_label(OrderStatus::UnderCreation), "Under Creation");
        assert_eq!(status_label(OrderStatus::Delivered), "Delivered");
    }

    #[test]
    fn unknown_status_strings_do_not_parse() {
        assert!(matches!(parse_status("On Process"), Ok(OrderStatus::OnProcess)));
        assert!(matches!(
            parse_status("Shipped"),
            Err(ServiceError::InvalidStatus(_))
        ));
        assert!(matches!(
            parse_status("delivered"),
            Err(ServiceError::InvalidStatus(_))
        ));
    }
}

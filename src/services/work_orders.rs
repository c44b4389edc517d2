use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity, ProductType},
    entities::work_order::{self, Entity as WorkOrderEntity, RawMaterialLine, WorkOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::apply_stock_change,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateWorkOrderRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub delivery_date: DateTime<Utc>,
    #[validate(length(min = 1, message = "At least one raw material is required"))]
    pub raw_materials: Vec<RawMaterialLine>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateWorkOrderRequest {
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: Option<i32>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Status name as stored, e.g. "Cutting", "Check quality", "Complete"
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<WorkOrderStatus, ServiceError> {
    use sea_orm::ActiveEnum;
    WorkOrderStatus::try_from_value(&raw.to_string())
        .map_err(|_| ServiceError::InvalidStatus(format!("Unknown work order status: {raw}")))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkOrderResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub delivery_date: DateTime<Utc>,
    pub raw_materials: Vec<RawMaterialLine>,
    pub notes: Option<String>,
    pub status: WorkOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkOrderListResponse {
    pub work_orders: Vec<WorkOrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for production work orders. Completing a work order credits the
/// finished good's stock exactly once.
#[derive(Clone)]
pub struct WorkOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl WorkOrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creating a work order records the raw-material plan but leaves all
    /// stock untouched; only completion moves inventory.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create_work_order(
        &self,
        request: CreateWorkOrderRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        request.validate()?;

        let db = self.db_pool.as_ref();
        let product = ProductEntity::find_by_id(request.product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", request.product_id))
            })?;

        for line in &request.raw_materials {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "Raw material quantity must be positive".to_string(),
                ));
            }
            let material = ProductEntity::find_by_id(line.product_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;
            if material.product_type != ProductType::RawMaterial {
                return Err(ServiceError::ValidationError(format!(
                    "Product {} is not a raw material",
                    material.name
                )));
            }
        }

        let raw_materials = serde_json::to_value(&request.raw_materials)
            .map_err(|e| ServiceError::InternalError(format!("Serialization failed: {e}")))?;

        let work_order = work_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(request.product_id),
            quantity: Set(request.quantity),
            delivery_date: Set(request.delivery_date),
            raw_materials: Set(raw_materials),
            notes: Set(request.notes),
            status: Set(WorkOrderStatus::Pending),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(work_order_id = %work_order.id, "Work order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::WorkOrderCreated(work_order.id))
                .await
            {
                warn!(error = %e, "Failed to send work order created event");
            }
        }

        Ok(to_response(work_order, Some(product.name)))
    }

    #[instrument(skip(self))]
    pub async fn get_work_order(&self, id: Uuid) -> Result<WorkOrderResponse, ServiceError> {
        let work_order = WorkOrderEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {id} not found")))?;
        let product_name = ProductEntity::find_by_id(work_order.product_id)
            .one(self.db_pool.as_ref())
            .await?
            .map(|p| p.name);
        Ok(to_response(work_order, product_name))
    }

    #[instrument(skip(self))]
    pub async fn list_work_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<WorkOrderListResponse, ServiceError> {
        let paginator = WorkOrderEntity::find()
            .order_by_desc(work_order::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut work_orders = Vec::with_capacity(rows.len());
        for row in rows {
            let product_name = ProductEntity::find_by_id(row.product_id)
                .one(self.db_pool.as_ref())
                .await?
                .map(|p| p.name);
            work_orders.push(to_response(row, product_name));
        }

        Ok(WorkOrderListResponse {
            work_orders,
            total,
            page,
            per_page,
        })
    }

    /// Status change with the completion stock credit. The +quantity effect
    /// and its ledger row fire only on the edge into Complete; re-submitting
    /// Complete is a stock no-op, and the credit happens at most once per
    /// crossing of that edge.
    #[instrument(skip(self), fields(work_order_id = %id))]
    pub async fn set_status(
        &self,
        id: Uuid,
        request: SetStatusRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for work order status change");
            ServiceError::DatabaseError(e)
        })?;

        let work_order = WorkOrderEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {id} not found")))?;

        let new_status = parse_status(&request.status)?;
        let old_status = work_order.status;
        let (updated, product_name) =
            apply_status_change(&txn, work_order, new_status).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, work_order_id = %id, "Failed to commit status change transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(work_order_id = %id, status = ?updated.status, "Work order status changed");

        if old_status != updated.status {
            if let Some(event_sender) = &self.event_sender {
                if let Err(e) = event_sender
                    .send(Event::WorkOrderStatusChanged {
                        work_order_id: id,
                        old_status: format!("{old_status:?}"),
                        new_status: format!("{:?}", updated.status),
                    })
                    .await
                {
                    warn!(error = %e, "Failed to send work order status event");
                }
            }
        }

        Ok(to_response(updated, product_name))
    }

    /// General field update. An embedded status change goes through the same
    /// guarded completion edge as [`set_status`], so the stock credit cannot
    /// be bypassed.
    #[instrument(skip(self, request), fields(work_order_id = %id))]
    pub async fn update_work_order(
        &self,
        id: Uuid,
        request: UpdateWorkOrderRequest,
    ) -> Result<WorkOrderResponse, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::DatabaseError)?;

        let work_order = WorkOrderEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {id} not found")))?;

        let mut active: work_order::ActiveModel = work_order.clone().into();
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(delivery_date) = request.delivery_date {
            active.delivery_date = Set(delivery_date);
        }
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        let updated = active.update(&txn).await?;

        let (updated, product_name) = match request.status.as_deref() {
            Some(status) => {
                let status = parse_status(status)?;
                apply_status_change(&txn, updated, status).await?
            }
            None => {
                let name = ProductEntity::find_by_id(updated.product_id)
                    .one(&txn)
                    .await?
                    .map(|p| p.name);
                (updated, name)
            }
        };

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(work_order_id = %id, "Work order updated");
        Ok(to_response(updated, product_name))
    }

    /// Deleting a work order always debits the finished good by the work
    /// order quantity and records it, whatever the status. The asymmetry
    /// with completion is deliberate and covered by tests.
    #[instrument(skip(self))]
    pub async fn delete_work_order(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for work order deletion");
            ServiceError::DatabaseError(e)
        })?;

        let work_order = WorkOrderEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {id} not found")))?;

        apply_stock_change(
            &txn,
            work_order.product_id,
            -work_order.quantity,
            format!("Work order {id} deleted"),
        )
        .await?;

        WorkOrderEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(work_order_id = %id, "Work order deleted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::WorkOrderDeleted(id)).await {
                warn!(error = %e, "Failed to send work order deleted event");
            }
        }

        Ok(())
    }

    /// Work orders created within a date range, newest first.
    #[instrument(skip(self))]
    pub async fn work_order_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkOrderResponse>, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "from must not be after to".to_string(),
            ));
        }

        let rows = WorkOrderEntity::find()
            .filter(work_order::Column::CreatedAt.gte(from))
            .filter(work_order::Column::CreatedAt.lte(to))
            .order_by_desc(work_order::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await?;

        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            let product_name = ProductEntity::find_by_id(row.product_id)
                .one(self.db_pool.as_ref())
                .await?
                .map(|p| p.name);
            responses.push(to_response(row, product_name));
        }
        Ok(responses)
    }
}

/// Shared status-change path for [`WorkOrderService::set_status`] and
/// [`WorkOrderService::update_work_order`]. Runs on the caller's
/// transaction; credits stock only when crossing into Complete.
async fn apply_status_change(
    txn: &DatabaseTransaction,
    work_order: work_order::Model,
    new_status: WorkOrderStatus,
) -> Result<(work_order::Model, Option<String>), ServiceError> {
    let old_status = work_order.status;
    if !old_status.can_transition_to(new_status) {
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot transition work order from {old_status:?} to {new_status:?}"
        )));
    }

    let mut product_name = None;
    if old_status != WorkOrderStatus::Complete && new_status == WorkOrderStatus::Complete {
        let product = ProductEntity::find_by_id(work_order.product_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", work_order.product_id))
            })?;
        product_name = Some(product.name.clone());
        apply_stock_change(
            txn,
            work_order.product_id,
            work_order.quantity,
            format!(
                "Work order {} for product {} completed",
                work_order.id, product.name
            ),
        )
        .await?;
    }

    if product_name.is_none() {
        product_name = ProductEntity::find_by_id(work_order.product_id)
            .one(txn)
            .await?
            .map(|p| p.name);
    }

    let id = work_order.id;
    let mut active: work_order::ActiveModel = work_order.into();
    active.status = Set(new_status);
    let updated = active.update(txn).await.map_err(|e| {
        error!(error = %e, work_order_id = %id, "Failed to update work order status");
        ServiceError::DatabaseError(e)
    })?;

    Ok((updated, product_name))
}

fn to_response(model: work_order::Model, product_name: Option<String>) -> WorkOrderResponse {
    let raw_materials =
        serde_json::from_value(model.raw_materials.clone()).unwrap_or_default();
    WorkOrderResponse {
        id: model.id,
        product_id: model.product_id,
        product_name,
        quantity: model.quantity,
        delivery_date: model.delivery_date,
        raw_materials,
        notes: model.notes,
        status: model.status,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

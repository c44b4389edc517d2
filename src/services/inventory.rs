use crate::{
    db::DbPool,
    entities::inventory_history::{self, Entity as HistoryEntity},
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Applies a signed stock delta to a product and records the matching
/// ledger row, on the caller's connection. Every stock mutation in the
/// system goes through here so the product quantity and the ledger can
/// never diverge within a transaction.
///
/// Stock may go negative; the ledger keeps the record honest either way.
pub async fn apply_stock_change<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    delta: i32,
    note: impl Into<String>,
) -> Result<product::Model, ServiceError> {
    let product = ProductEntity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

    let new_quantity = product.stock_quantity + delta;

    let mut active: product::ActiveModel = product.into();
    active.stock_quantity = Set(new_quantity);
    let updated = active.update(conn).await?;

    let now = Utc::now();
    inventory_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        change_date: Set(now),
        quantity_change: Set(delta),
        note: Set(Some(note.into())),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    Ok(updated)
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    /// Signed delta; positive receives stock, negative issues it
    #[validate(range(min = -1_000_000, max = 1_000_000))]
    pub quantity_change: i32,
    #[validate(length(min = 1, max = 500))]
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub change_date: DateTime<Utc>,
    pub quantity_change: i32,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryListResponse {
    pub entries: Vec<HistoryEntryResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for manual stock adjustments and ledger queries.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Manual stock adjustment: one paired stock + ledger write in its own
    /// transaction.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn adjust_stock(
        &self,
        request: AdjustStockRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        if request.quantity_change == 0 {
            return Err(ServiceError::ValidationError(
                "quantity_change must be non-zero".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for stock adjustment");
            ServiceError::DatabaseError(e)
        })?;

        let product = apply_stock_change(
            &txn,
            request.product_id,
            request.quantity_change,
            request.note,
        )
        .await?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            product_id = %product.id,
            quantity_change = request.quantity_change,
            new_quantity = product.stock_quantity,
            "Stock adjusted"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::InventoryAdjusted {
                    product_id: product.id,
                    quantity_change: request.quantity_change,
                    new_quantity: product.stock_quantity,
                })
                .await
            {
                warn!(error = %e, "Failed to send inventory adjusted event");
            }
        }

        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn get_history_entry(
        &self,
        id: Uuid,
    ) -> Result<inventory_history::Model, ServiceError> {
        HistoryEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory history {id} not found")))
    }

    /// Ledger page, newest first.
    #[instrument(skip(self))]
    pub async fn list_history(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<HistoryListResponse, ServiceError> {
        let paginator = HistoryEntity::find()
            .order_by_desc(inventory_history::Column::ChangeDate)
            .paginate(self.db_pool.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let entries = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(HistoryListResponse {
            entries: self.with_product_names(entries).await?,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn history_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<HistoryEntryResponse>, ServiceError> {
        let product = ProductEntity::find_by_id(product_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        let entries = HistoryEntity::find()
            .filter(inventory_history::Column::ProductId.eq(product_id))
            .order_by_desc(inventory_history::Column::ChangeDate)
            .all(self.db_pool.as_ref())
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| HistoryEntryResponse {
                id: entry.id,
                product_id: entry.product_id,
                product_name: Some(product.name.clone()),
                change_date: entry.change_date,
                quantity_change: entry.quantity_change,
                note: entry.note,
            })
            .collect())
    }

    /// Date-range ledger report with product names.
    #[instrument(skip(self))]
    pub async fn history_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntryResponse>, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "from must not be after to".to_string(),
            ));
        }

        let entries = HistoryEntity::find()
            .filter(inventory_history::Column::ChangeDate.gte(from))
            .filter(inventory_history::Column::ChangeDate.lte(to))
            .order_by_desc(inventory_history::Column::ChangeDate)
            .all(self.db_pool.as_ref())
            .await?;

        self.with_product_names(entries).await
    }

    async fn with_product_names(
        &self,
        entries: Vec<inventory_history::Model>,
    ) -> Result<Vec<HistoryEntryResponse>, ServiceError> {
        let mut responses = Vec::with_capacity(entries.len());
        for entry in entries {
            let product_name = ProductEntity::find_by_id(entry.product_id)
                .one(self.db_pool.as_ref())
                .await?
                .map(|p| p.name);
            responses.push(HistoryEntryResponse {
                id: entry.id,
                product_id: entry.product_id,
                product_name,
                change_date: entry.change_date,
                quantity_change: entry.quantity_change,
                note: entry.note,
            });
        }
        Ok(responses)
    }
}

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity, ProductType},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    pub product_type: ProductType,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub product_type: Option<ProductType>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<product::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// One row of the most-selling-products report.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductSalesRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Stock is set directly at creation; subsequent changes go through the
    /// inventory service so they hit the ledger.
    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let existing = ProductEntity::find()
            .filter(product::Column::Sku.eq(request.sku.clone()))
            .one(self.db_pool.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU {} already exists",
                request.sku
            )));
        }

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(request.sku),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            stock_quantity: Set(request.stock_quantity),
            product_type: Set(request.product_type),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db_pool.as_ref())
        .await?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let paginator = ProductEntity::find()
            .order_by_asc(product::Column::Name)
            .paginate(self.db_pool.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    /// All products of one type, e.g. the raw materials for work order forms.
    #[instrument(skip(self))]
    pub async fn list_by_type(
        &self,
        product_type: ProductType,
    ) -> Result<Vec<product::Model>, ServiceError> {
        ProductEntity::find()
            .filter(product::Column::ProductType.eq(product_type))
            .order_by_asc(product::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let product = self.get_product(id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(product_type) = request.product_type {
            active.product_type = Set(product_type);
        }

        let updated = active.update(self.db_pool.as_ref()).await?;
        info!(product_id = %updated.id, "Product updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(id).await?;
        ProductEntity::delete_by_id(product.id)
            .exec(self.db_pool.as_ref())
            .await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Aggregates ordered quantities per product over a date range, sorted
    /// descending. Order items are joined through their order's creation
    /// date.
    #[instrument(skip(self))]
    pub async fn most_selling_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProductSalesRow>, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "from must not be after to".to_string(),
            ));
        }

        let orders = OrderEntity::find()
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lte(to))
            .all(self.db_pool.as_ref())
            .await?;
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        if order_ids.is_empty() {
            return Ok(vec![]);
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .all(self.db_pool.as_ref())
            .await?;

        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        for item in items {
            *totals.entry(item.product_id).or_default() += i64::from(item.quantity);
        }

        let mut rows = Vec::with_capacity(totals.len());
        for (product_id, total_quantity) in totals {
            let product_name = ProductEntity::find_by_id(product_id)
                .one(self.db_pool.as_ref())
                .await?
                .map(|p| p.name)
                .unwrap_or_else(|| "(deleted product)".to_string());
            rows.push(ProductSalesRow {
                product_id,
                product_name,
                total_quantity,
            });
        }
        rows.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
        Ok(rows)
    }
}

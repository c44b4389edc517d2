use crate::{
    db::DbPool,
    entities::notification::{self, Entity as NotificationEntity, NotificationStatus},
    errors::ServiceError,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// All notifications, newest first.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<notification::Model>, ServiceError> {
        NotificationEntity::find()
            .order_by_desc(notification::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// A user's notifications, newest first. Reading has a side effect:
    /// every unread row in the returned set is marked read, so the next
    /// unread count starts from zero.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::DatabaseError)?;

        let notifications = NotificationEntity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&txn)
            .await?;

        let unread: Vec<Uuid> = notifications
            .iter()
            .filter(|n| n.status == NotificationStatus::Unread)
            .map(|n| n.id)
            .collect();

        if !unread.is_empty() {
            NotificationEntity::update_many()
                .col_expr(
                    notification::Column::Status,
                    Expr::value(NotificationStatus::Read),
                )
                .filter(notification::Column::Id.is_in(unread.clone()))
                .exec(&txn)
                .await?;
            info!(user_id = %user_id, count = unread.len(), "Marked notifications read");
        }

        txn.commit().await.map_err(ServiceError::DatabaseError)?;
        Ok(notifications)
    }

    #[instrument(skip(self))]
    pub async fn unread_count(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        NotificationEntity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Status.eq(NotificationStatus::Unread))
            .count(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = NotificationEntity::update_many()
            .col_expr(
                notification::Column::Status,
                Expr::value(NotificationStatus::Read),
            )
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Status.eq(NotificationStatus::Unread))
            .exec(self.db_pool.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Direct insert, used outside the order update path.
    #[instrument(skip(self, title))]
    pub async fn create(
        &self,
        user_id: Uuid,
        title: String,
    ) -> Result<notification::Model, ServiceError> {
        use sea_orm::ActiveModelTrait;

        notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(title),
            status: Set(NotificationStatus::Unread),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::DatabaseError)
    }
}

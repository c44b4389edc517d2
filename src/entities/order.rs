use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle states. Transitions are checked by
/// [`OrderStatus::can_transition_to`]; Delivered is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Under Creation")]
    #[serde(rename = "Under Creation")]
    UnderCreation,
    #[sea_orm(string_value = "Process")]
    Process,
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "On Process")]
    #[serde(rename = "On Process")]
    OnProcess,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
}

impl OrderStatus {
    /// Self-transitions are always allowed so resubmitting an unchanged
    /// status is a no-op rather than an error.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (UnderCreation, Pending)
                | (UnderCreation, Process)
                | (Process, Pending)
                | (Process, OnProcess)
                | (Pending, OnProcess)
                | (Pending, Delivered)
                | (OnProcess, Delivered)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,
    pub delivery_date: DateTime<Utc>,
    pub shipping_address: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.updated_at = Set(Some(Utc::now()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn delivered_is_terminal_except_for_itself() {
        assert!(Delivered.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(OnProcess));
        assert!(!Delivered.can_transition_to(UnderCreation));
    }

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(UnderCreation.can_transition_to(Pending));
        assert!(Process.can_transition_to(OnProcess));
        assert!(Pending.can_transition_to(Delivered));
        assert!(OnProcess.can_transition_to(Delivered));
    }

    #[test]
    fn backward_transitions_are_rejected() {
        assert!(!Pending.can_transition_to(UnderCreation));
        assert!(!OnProcess.can_transition_to(Pending));
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Production stages. The stock credit for the finished good happens only on
/// the edge into Complete; see the work order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum WorkOrderStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Cutting")]
    Cutting,
    #[sea_orm(string_value = "Sewing")]
    Sewing,
    #[sea_orm(string_value = "Printing")]
    Printing,
    #[sea_orm(string_value = "Check quality")]
    #[serde(rename = "Check quality")]
    CheckQuality,
    #[sea_orm(string_value = "Complete")]
    Complete,
}

impl WorkOrderStatus {
    fn stage_index(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Cutting => 1,
            Self::Sewing => 2,
            Self::Printing => 3,
            Self::CheckQuality => 4,
            Self::Complete => 5,
        }
    }

    /// Forward along the production line, any stage may jump to Complete,
    /// and a Complete order may be reopened to any stage. Reopening never
    /// reverses the stock credit.
    pub fn can_transition_to(self, next: WorkOrderStatus) -> bool {
        if self == next || next == Self::Complete || self == Self::Complete {
            return true;
        }
        next.stage_index() == self.stage_index() + 1
    }
}

/// One raw-material requirement line, stored opaquely in the
/// `raw_materials` JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMaterialLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Finished good being produced
    pub product_id: Uuid,
    pub quantity: i32,
    pub delivery_date: DateTime<Utc>,

    /// List of [`RawMaterialLine`] values
    pub raw_materials: Json,

    pub notes: Option<String>,
    pub status: WorkOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
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

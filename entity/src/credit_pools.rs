//! `SeaORM` Entity for credit pools created from authorized orders

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_pools")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Originating order; at most one pool per order
    #[sea_orm(unique)]
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: String,
    pub total_credits: i32,
    pub remaining_credits: i32,
    pub is_active: bool,
    /// FIFO sort key
    pub created_at: TimeDateTimeWithTimeZone,
    pub expires_at: Option<TimeDateTimeWithTimeZone>,
    pub deactivated_at: Option<TimeDateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub deactivation_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Orders,
    #[sea_orm(has_many = "super::credit_usages::Entity")]
    CreditUsages,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::credit_usages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

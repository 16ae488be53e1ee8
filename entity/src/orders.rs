//! `SeaORM` Entity for purchase orders moving through the approval chain

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::OrderStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable display token, unique
    #[sea_orm(unique)]
    pub order_number: String,
    /// Buyer
    pub user_id: String,
    pub plan_id: String,
    /// Credits granted once the order is authorized
    pub plan_credits: i32,
    /// Price in minor currency units
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub status: OrderStatus,
    #[sea_orm(unique)]
    pub receipt_number: Option<String>,
    pub validated_by: Option<String>,
    pub validated_at: Option<TimeDateTimeWithTimeZone>,
    pub authorized_by: Option<String>,
    pub authorized_at: Option<TimeDateTimeWithTimeZone>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<TimeDateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::credit_pools::Entity")]
    CreditPools,
}

impl Related<super::credit_pools::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditPools.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

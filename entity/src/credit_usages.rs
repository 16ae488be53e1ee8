//! `SeaORM` Entity for append-only credit usage receipts

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_usages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub pool_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    /// Caller-supplied identifier of what consumed the credit (e.g. a simulation run)
    pub subject_id: String,
    pub label: String,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::credit_pools::Entity",
        from = "Column::PoolId",
        to = "super::credit_pools::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    CreditPools,
}

impl Related<super::credit_pools::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditPools.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

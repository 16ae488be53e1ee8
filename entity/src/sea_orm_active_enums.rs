use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Approval state of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending_validation")]
    PendingValidation,
    #[sea_orm(string_value = "validated")]
    Validated,
    #[sea_orm(string_value = "authorized")]
    Authorized,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "expired")]
    Expired,
}

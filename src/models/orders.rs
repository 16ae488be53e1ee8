use entity::{orders, sea_orm_active_enums::OrderStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Fields supplied by order origination (checkout)
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub plan_id: String,
    pub plan_credits: i32,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// POST /api/v1/orders
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub plan_id: String,

    #[validate(range(min = 1))]
    pub plan_credits: i32,

    #[validate(range(min = 0))]
    pub amount: i64,

    #[validate(length(equal = 3))]
    pub currency: String,

    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_new_order(self, user_id: &str) -> NewOrder {
        NewOrder {
            user_id: user_id.to_string(),
            plan_id: self.plan_id,
            plan_credits: self.plan_credits,
            amount: self.amount,
            currency: self.currency,
            payment_method: self.payment_method,
            notes: self.notes,
        }
    }
}

/// POST /api/v1/orders/{id}/transition
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub target_status: OrderStatus,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: String,
    pub plan_id: String,
    pub plan_credits: i32,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub receipt_number: Option<String>,
    pub validated_by: Option<String>,
    pub validated_at: Option<time::OffsetDateTime>,
    pub authorized_by: Option<String>,
    pub authorized_at: Option<time::OffsetDateTime>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<time::OffsetDateTime>,
    pub notes: Option<String>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

impl From<orders::Model> for OrderResponse {
    fn from(order: orders::Model) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            plan_id: order.plan_id,
            plan_credits: order.plan_credits,
            amount: order.amount,
            currency: order.currency,
            payment_method: order.payment_method,
            status: order.status,
            receipt_number: order.receipt_number,
            validated_by: order.validated_by,
            validated_at: order.validated_at,
            authorized_by: order.authorized_by,
            authorized_at: order.authorized_at,
            cancelled_by: order.cancelled_by,
            cancelled_at: order.cancelled_at,
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

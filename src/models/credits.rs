use entity::{credit_pools, credit_usages, sea_orm_active_enums::OrderStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::credit_pool_ext::CreditPoolExt;

/// Derived display status of a pool; `Inactive` overrides the rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Unused,
    PartiallyUsed,
    Exhausted,
    Inactive,
}

/// Aggregate over a user's pools. Totals cover active pools only; credits
/// stranded in deactivated pools are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditStatus {
    pub total_credits: i64,
    pub remaining_credits: i64,
    pub used_credits: i64,
    /// Pools that can still be drawn from
    pub active_pools: u32,
    /// Unspent credits in deactivated pools; never consumable
    pub deactivated_remaining_credits: i64,
}

impl CreditStatus {
    pub fn from_pools<'a>(pools: impl IntoIterator<Item = &'a credit_pools::Model>) -> Self {
        pools.into_iter().fold(Self::default(), |mut acc, p| {
            if !p.is_active {
                acc.deactivated_remaining_credits += i64::from(p.remaining_credits);
                return acc;
            }
            acc.total_credits += i64::from(p.total_credits);
            acc.remaining_credits += i64::from(p.remaining_credits);
            acc.used_credits += i64::from(p.used());
            if p.is_eligible() {
                acc.active_pools += 1;
            }
            acc
        })
    }
}

/// POST /api/v1/credits/consume
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    #[validate(length(min = 1, max = 255))]
    pub subject_id: String,

    #[validate(length(min = 1, max = 255))]
    pub label: String,
}

/// POST /api/v1/admin/pools/{id}/deactivate
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeactivatePoolRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreditPoolResponse {
    pub pool_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub total_credits: i32,
    pub remaining_credits: i32,
    pub used_credits: i32,
    pub status: PoolStatus,
    pub created_at: time::OffsetDateTime,
    pub expires_at: Option<time::OffsetDateTime>,
}

impl From<credit_pools::Model> for CreditPoolResponse {
    fn from(pool: credit_pools::Model) -> Self {
        Self {
            pool_id: pool.id,
            order_id: pool.order_id,
            order_number: pool.order_number.clone(),
            total_credits: pool.total_credits,
            remaining_credits: pool.remaining_credits,
            used_credits: pool.used(),
            status: pool.status(),
            created_at: pool.created_at,
            expires_at: pool.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsageReceiptResponse {
    pub receipt_id: Uuid,
    pub pool_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub subject_id: String,
    pub label: String,
    pub consumed_at: time::OffsetDateTime,
}

impl From<credit_usages::Model> for UsageReceiptResponse {
    fn from(usage: credit_usages::Model) -> Self {
        Self {
            receipt_id: usage.id,
            pool_id: usage.pool_id,
            order_id: usage.order_id,
            order_number: usage.order_number,
            subject_id: usage.subject_id,
            label: usage.label,
            consumed_at: usage.created_at,
        }
    }
}

/// A broken authorize/pool-create invariant found by reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    AuthorizedWithoutPool {
        order_id: Uuid,
        order_number: String,
    },
    PoolWithoutAuthorizedOrder {
        pool_id: Uuid,
        order_id: Uuid,
        order_status: Option<OrderStatus>,
    },
}

impl Inconsistency {
    pub fn order_id(&self) -> Uuid {
        match self {
            Inconsistency::AuthorizedWithoutPool { order_id, .. }
            | Inconsistency::PoolWithoutAuthorizedOrder { order_id, .. } => *order_id,
        }
    }
}

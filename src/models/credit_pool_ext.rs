//! Extension methods for credit_pools entity
//!
//! Derived, never-stored views over the generated entity in entity/src/credit_pools.rs
use entity::credit_pools;

use super::credits::PoolStatus;

pub trait CreditPoolExt {
    /// Credits already debited (total - remaining)
    fn used(&self) -> i32;

    /// Eligible for consumption iff active and not exhausted
    fn is_eligible(&self) -> bool;

    fn status(&self) -> PoolStatus;
}

impl CreditPoolExt for credit_pools::Model {
    fn used(&self) -> i32 {
        self.total_credits - self.remaining_credits
    }

    fn is_eligible(&self) -> bool {
        self.is_active && self.remaining_credits > 0
    }

    fn status(&self) -> PoolStatus {
        if !self.is_active {
            PoolStatus::Inactive
        } else if self.remaining_credits == 0 {
            PoolStatus::Exhausted
        } else if self.remaining_credits == self.total_credits {
            PoolStatus::Unused
        } else {
            PoolStatus::PartiallyUsed
        }
    }
}

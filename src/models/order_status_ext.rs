//! Transition table for the order approval chain
//!
//! Complements the generated `OrderStatus` enum in entity/src/sea_orm_active_enums.rs
use entity::sea_orm_active_enums::OrderStatus;

use super::common::Capability;

/// Who may perform a given transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRule {
    /// Actor must hold the capability
    Requires(Capability),
    /// The order's buyer, or an actor holding the capability
    BuyerOr(Capability),
}

pub trait OrderStatusExt {
    fn as_str(&self) -> &'static str;

    /// `authorized`, `cancelled` and `expired` accept no further transitions
    fn is_terminal(&self) -> bool;

    /// `None` when `target` is not a legal successor
    fn transition_rule(&self, target: OrderStatus) -> Option<TransitionRule>;

    fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.transition_rule(target).is_some()
    }
}

impl OrderStatusExt for OrderStatus {
    fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingValidation => "pending_validation",
            OrderStatus::Validated => "validated",
            OrderStatus::Authorized => "authorized",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Authorized | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    fn transition_rule(&self, target: OrderStatus) -> Option<TransitionRule> {
        use OrderStatus::*;

        match (self, target) {
            (PendingValidation, Validated) => Some(TransitionRule::Requires(Capability::Cashier)),
            (Validated, Authorized) => Some(TransitionRule::Requires(Capability::Admin)),
            (PendingValidation | Validated, Cancelled) => {
                Some(TransitionRule::BuyerOr(Capability::Cashier))
            }
            (PendingValidation | Validated, Expired) => {
                Some(TransitionRule::Requires(Capability::Admin))
            }
            _ => None,
        }
    }
}

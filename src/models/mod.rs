// Request/Response models
pub mod common;
pub mod credit_pool_ext; // Derived views over entity::credit_pools
pub mod credits;
pub mod order_status_ext; // Transition table for entity::sea_orm_active_enums::OrderStatus
pub mod orders;

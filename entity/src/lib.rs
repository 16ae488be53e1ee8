//! `SeaORM` entities for the credit ledger

pub mod prelude;

pub mod credit_pools;
pub mod credit_usages;
pub mod orders;
pub mod sea_orm_active_enums;

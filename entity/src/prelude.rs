pub use super::credit_pools::Entity as CreditPools;
pub use super::credit_usages::Entity as CreditUsages;
pub use super::orders::Entity as Orders;

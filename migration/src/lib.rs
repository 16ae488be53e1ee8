pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_orders;
mod m20250301_000002_create_credit_pools;
mod m20250301_000003_create_credit_usages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_orders::Migration),
            Box::new(m20250301_000002_create_credit_pools::Migration),
            Box::new(m20250301_000003_create_credit_usages::Migration),
        ]
    }
}

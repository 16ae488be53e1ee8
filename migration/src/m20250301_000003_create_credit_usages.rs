use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only: rows are written together with the pool decrement
        manager
            .create_table(
                Table::create()
                    .table(CreditUsages::Table)
                    .if_not_exists()
                    .col(pk_uuid(CreditUsages::Id))
                    .col(string(CreditUsages::UserId))
                    .col(uuid(CreditUsages::PoolId))
                    .col(uuid(CreditUsages::OrderId))
                    .col(string(CreditUsages::OrderNumber))
                    .col(string(CreditUsages::SubjectId))
                    .col(string(CreditUsages::Label))
                    .col(
                        timestamp_with_time_zone(CreditUsages::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_usages_pool_id")
                            .from(CreditUsages::Table, CreditUsages::PoolId)
                            .to(CreditPools::Table, CreditPools::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_credit_usages_pool_id")
                    .table(CreditUsages::Table)
                    .col(CreditUsages::PoolId)
                    .to_owned(),
            )
            .await?;

        // Lookup for callers re-checking whether a debit landed
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_usages_user_subject")
                    .table(CreditUsages::Table)
                    .col(CreditUsages::UserId)
                    .col(CreditUsages::SubjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditUsages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CreditUsages {
    Table,
    Id,
    UserId,
    PoolId,
    OrderId,
    OrderNumber,
    SubjectId,
    Label,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CreditPools {
    Table,
    Id,
}

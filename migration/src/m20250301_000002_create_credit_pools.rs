use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CreditPools::Table)
                    .if_not_exists()
                    .col(pk_uuid(CreditPools::Id))
                    .col(uuid(CreditPools::OrderId))
                    .col(string(CreditPools::OrderNumber))
                    .col(string(CreditPools::UserId))
                    .col(
                        integer(CreditPools::TotalCredits)
                            .check(Expr::col(CreditPools::TotalCredits).gt(0)),
                    )
                    .col(
                        integer(CreditPools::RemainingCredits)
                            .check(Expr::col(CreditPools::RemainingCredits).gte(0)),
                    )
                    .col(boolean(CreditPools::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(CreditPools::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(CreditPools::ExpiresAt))
                    .col(timestamp_with_time_zone_null(CreditPools::DeactivatedAt))
                    .col(text_null(CreditPools::DeactivationReason))
                    .check(
                        Expr::col(CreditPools::RemainingCredits)
                            .lte(Expr::col(CreditPools::TotalCredits)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_pools_order_id")
                            .from(CreditPools::Table, CreditPools::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Exactly one pool per order; pool creation relies on this to be idempotent
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_pools_order_id")
                    .table(CreditPools::Table)
                    .col(CreditPools::OrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // FIFO scan: a user's pools by creation time
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_pools_user_created")
                    .table(CreditPools::Table)
                    .col(CreditPools::UserId)
                    .col(CreditPools::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditPools::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CreditPools {
    Table,
    Id,
    OrderId,
    OrderNumber,
    UserId,
    TotalCredits,
    RemainingCredits,
    IsActive,
    CreatedAt,
    ExpiresAt,
    DeactivatedAt,
    DeactivationReason,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
}

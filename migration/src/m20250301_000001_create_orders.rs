use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Status is stored as text so the same schema runs on Postgres and SQLite
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_uuid(Orders::Id))
                    .col(string(Orders::OrderNumber).unique_key())
                    .col(string(Orders::UserId))
                    .col(string(Orders::PlanId))
                    .col(integer(Orders::PlanCredits).check(Expr::col(Orders::PlanCredits).gt(0)))
                    .col(big_integer(Orders::Amount).check(Expr::col(Orders::Amount).gte(0)))
                    .col(string(Orders::Currency))
                    .col(string(Orders::PaymentMethod))
                    .col(string(Orders::Status).default("pending_validation"))
                    .col(string_null(Orders::ReceiptNumber))
                    .col(string_null(Orders::ValidatedBy))
                    .col(timestamp_with_time_zone_null(Orders::ValidatedAt))
                    .col(string_null(Orders::AuthorizedBy))
                    .col(timestamp_with_time_zone_null(Orders::AuthorizedAt))
                    .col(string_null(Orders::CancelledBy))
                    .col(timestamp_with_time_zone_null(Orders::CancelledAt))
                    .col(text_null(Orders::Notes))
                    .col(
                        timestamp_with_time_zone(Orders::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Orders::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Receipt numbers are minted at validation; NULL until then
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_receipt_number")
                    .table(Orders::Table)
                    .col(Orders::ReceiptNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        // Work queues and the expiry sweep scan by status, oldest first
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_status_created_at")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    UserId,
    PlanId,
    PlanCredits,
    Amount,
    Currency,
    PaymentMethod,
    Status,
    ReceiptNumber,
    ValidatedBy,
    ValidatedAt,
    AuthorizedBy,
    AuthorizedAt,
    CancelledBy,
    CancelledAt,
    Notes,
    CreatedAt,
    UpdatedAt,
}

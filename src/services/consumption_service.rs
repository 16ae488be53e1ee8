use crate::{
    error::{LedgerError, Result},
    models::credits::CreditStatus,
};
use entity::{credit_pools, credit_usages};
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ConnectionTrait, DatabaseConnection, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Debits credits one unit at a time, oldest eligible pool first.
pub struct ConsumptionService {
    db: DatabaseConnection,
    max_attempts: u32,
}

impl ConsumptionService {
    pub fn new(db: DatabaseConnection, max_attempts: u32) -> Self {
        Self {
            db,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Debit one credit for `user_id` and record a usage receipt.
    ///
    /// The decrement and the receipt are written in one transaction. The
    /// decrement itself is a guarded update (`remaining > 0 AND is_active`),
    /// so concurrent callers never drive a pool negative; a caller that loses
    /// the race moves on to the next FIFO candidate.
    ///
    /// Every call is a fresh debit: callers must invoke this at most once per
    /// consumable event, and after a timeout re-check with
    /// [`receipts_for_subject`](Self::receipts_for_subject) before retrying.
    #[instrument(skip(self))]
    pub async fn consume(
        &self,
        user_id: &str,
        subject_id: &str,
        label: &str,
    ) -> Result<credit_usages::Model> {
        if user_id.is_empty() {
            return Err(LedgerError::BadRequest("user id is required".to_string()));
        }
        if subject_id.is_empty() {
            return Err(LedgerError::BadRequest(
                "consumption subject id is required".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        for attempt in 1..=self.max_attempts {
            let Some(pool) = Self::oldest_eligible_pool(user_id, &txn).await? else {
                txn.rollback().await?;
                return Err(LedgerError::NoCreditsAvailable(user_id.to_string()));
            };

            let debit = credit_pools::Entity::update_many()
                .col_expr(
                    credit_pools::Column::RemainingCredits,
                    Expr::col(credit_pools::Column::RemainingCredits).sub(1),
                )
                .filter(credit_pools::Column::Id.eq(pool.id))
                .filter(credit_pools::Column::IsActive.eq(true))
                .filter(credit_pools::Column::RemainingCredits.gt(0))
                .exec(&txn)
                .await?;

            if debit.rows_affected == 0 {
                warn!(
                    attempt,
                    pool_id = %pool.id,
                    "Lost race for pool's last credit, trying next candidate"
                );
                continue;
            }

            let receipt = credit_usages::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id.to_string()),
                pool_id: Set(pool.id),
                order_id: Set(pool.order_id),
                order_number: Set(pool.order_number.clone()),
                subject_id: Set(subject_id.to_string()),
                label: Set(label.to_string()),
                created_at: Set(time::OffsetDateTime::now_utc()),
            }
            .insert(&txn)
            .await?;

            txn.commit().await?;

            info!(
                user_id = user_id,
                subject_id = subject_id,
                pool_id = %pool.id,
                order_number = %pool.order_number,
                remaining = pool.remaining_credits - 1,
                "Consumed 1 credit"
            );

            return Ok(receipt);
        }

        txn.rollback().await?;
        Err(LedgerError::Contention(format!(
            "could not debit a credit for user {} after {} attempts",
            user_id, self.max_attempts
        )))
    }

    /// Fast precondition check for upstream gating
    #[instrument(skip(self))]
    pub async fn has_available_credits(&self, user_id: &str) -> Result<bool> {
        Ok(Self::oldest_eligible_pool(user_id, &self.db).await?.is_some())
    }

    #[instrument(skip(self))]
    pub async fn get_credit_status(&self, user_id: &str) -> Result<CreditStatus> {
        let pools = credit_pools::Entity::find()
            .filter(credit_pools::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        Ok(CreditStatus::from_pools(&pools))
    }

    /// Receipts recorded for one consumption subject, oldest first.
    /// Lets a caller with an unknown outcome find out whether its debit landed.
    pub async fn receipts_for_subject(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<Vec<credit_usages::Model>> {
        let receipts = credit_usages::Entity::find()
            .filter(credit_usages::Column::UserId.eq(user_id))
            .filter(credit_usages::Column::SubjectId.eq(subject_id))
            .order_by_asc(credit_usages::Column::CreatedAt)
            .order_by_asc(credit_usages::Column::Id)
            .all(&self.db)
            .await?;

        Ok(receipts)
    }

    /// FIFO selection: smallest `created_at`, ties broken by pool id
    async fn oldest_eligible_pool<C: ConnectionTrait>(
        user_id: &str,
        conn: &C,
    ) -> Result<Option<credit_pools::Model>> {
        let pool = credit_pools::Entity::find()
            .filter(credit_pools::Column::UserId.eq(user_id))
            .filter(credit_pools::Column::IsActive.eq(true))
            .filter(credit_pools::Column::RemainingCredits.gt(0))
            .order_by_asc(credit_pools::Column::CreatedAt)
            .order_by_asc(credit_pools::Column::Id)
            .one(conn)
            .await?;

        Ok(pool)
    }
}

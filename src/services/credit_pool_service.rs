use crate::{
    error::{LedgerError, Result},
    models::{common::Capability, order_status_ext::OrderStatusExt},
    services::capability_service::CapabilityProvider,
};
use anyhow::anyhow;
use entity::{credit_pools, credit_usages, orders, sea_orm_active_enums::OrderStatus};
use sea_orm::{
    entity::*, query::*, sea_query::{Expr, OnConflict}, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Owns the order -> pool mapping. Pools are immutable apart from
/// `remaining_credits` (consumption) and the active flag (deactivation).
pub struct CreditPoolService {
    db: DatabaseConnection,
    capabilities: Arc<dyn CapabilityProvider>,
}

impl CreditPoolService {
    pub fn new(db: DatabaseConnection, capabilities: Arc<dyn CapabilityProvider>) -> Self {
        Self { db, capabilities }
    }

    /// Create the pool for an authorized order in its own transaction.
    ///
    /// Fails with `DuplicatePool` if the order already has one.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn create_pool_from_order(
        &self,
        order: &orders::Model,
    ) -> Result<credit_pools::Model> {
        let txn = self.db.begin().await?;
        let pool = self.create_pool_in_txn(order, &txn).await?;
        txn.commit().await?;

        Ok(pool)
    }

    /// Create the pool for an authorized order within an existing transaction.
    /// Used by the authorization path so the status change and the pool commit together.
    #[instrument(skip(self, order, txn), fields(order_id = %order.id))]
    pub async fn create_pool_in_txn(
        &self,
        order: &orders::Model,
        txn: &DatabaseTransaction,
    ) -> Result<credit_pools::Model> {
        if order.status != OrderStatus::Authorized {
            return Err(LedgerError::InvalidTransition(format!(
                "order {} is {}; pools are only created from authorized orders",
                order.order_number,
                order.status.as_str()
            )));
        }

        let now = time::OffsetDateTime::now_utc();
        let pool_id = Uuid::new_v4();

        let new_pool = credit_pools::ActiveModel {
            id: Set(pool_id),
            order_id: Set(order.id),
            order_number: Set(order.order_number.clone()),
            user_id: Set(order.user_id.clone()),
            total_credits: Set(order.plan_credits),
            remaining_credits: Set(order.plan_credits),
            is_active: Set(true),
            created_at: Set(now),
            expires_at: Set(None),
            deactivated_at: Set(None),
            deactivation_reason: Set(None),
        };

        // The unique index on order_id is the exactly-once guard; a conflicting
        // insert becomes a no-op instead of aborting the transaction.
        let inserted = credit_pools::Entity::insert(new_pool)
            .on_conflict(
                OnConflict::column(credit_pools::Column::OrderId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;

        if inserted == 0 {
            return Err(LedgerError::DuplicatePool(order.id));
        }

        let pool = credit_pools::Entity::find_by_id(pool_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                LedgerError::Internal(anyhow!(
                    "Failed to read credit pool after insert for order {}",
                    order.id
                ))
            })?;

        info!(
            pool_id = %pool.id,
            order_number = %pool.order_number,
            user_id = %pool.user_id,
            credits = pool.total_credits,
            "Created credit pool"
        );

        Ok(pool)
    }

    /// All pools for a user, oldest first (the FIFO order)
    #[instrument(skip(self))]
    pub async fn list_pools_for_user(&self, user_id: &str) -> Result<Vec<credit_pools::Model>> {
        let pools = credit_pools::Entity::find()
            .filter(credit_pools::Column::UserId.eq(user_id))
            .order_by_asc(credit_pools::Column::CreatedAt)
            .order_by_asc(credit_pools::Column::Id)
            .all(&self.db)
            .await?;

        Ok(pools)
    }

    pub async fn get_pool(&self, pool_id: Uuid) -> Result<credit_pools::Model> {
        credit_pools::Entity::find_by_id(pool_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::PoolNotFound(pool_id.to_string()))
    }

    pub async fn get_pool_for_order(&self, order_id: Uuid) -> Result<Option<credit_pools::Model>> {
        Self::find_pool_for_order(order_id, &self.db).await
    }

    pub(crate) async fn find_pool_for_order<C: ConnectionTrait>(
        order_id: Uuid,
        conn: &C,
    ) -> Result<Option<credit_pools::Model>> {
        let pool = credit_pools::Entity::find()
            .filter(credit_pools::Column::OrderId.eq(order_id))
            .one(conn)
            .await?;

        Ok(pool)
    }

    /// Administrative reversal (e.g. refund). The pool keeps its remaining count
    /// but is permanently excluded from consumption. Deactivating an inactive
    /// pool is a no-op.
    #[instrument(skip(self))]
    pub async fn deactivate_pool(
        &self,
        pool_id: Uuid,
        actor_id: &str,
        reason: Option<&str>,
    ) -> Result<credit_pools::Model> {
        self.capabilities.require(actor_id, Capability::Admin).await?;

        let now = time::OffsetDateTime::now_utc();
        let result = credit_pools::Entity::update_many()
            .col_expr(credit_pools::Column::IsActive, Expr::value(false))
            .col_expr(credit_pools::Column::DeactivatedAt, Expr::value(Some(now)))
            .col_expr(
                credit_pools::Column::DeactivationReason,
                Expr::value(reason.map(|r| r.to_string())),
            )
            .filter(credit_pools::Column::Id.eq(pool_id))
            .filter(credit_pools::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;

        let pool = self.get_pool(pool_id).await?;

        if result.rows_affected == 0 {
            debug!(pool_id = %pool_id, "Pool already inactive");
        } else {
            info!(
                pool_id = %pool_id,
                actor_id = actor_id,
                remaining = pool.remaining_credits,
                "Deactivated credit pool"
            );
        }

        Ok(pool)
    }

    /// Usage receipts drawn from a pool, oldest first
    pub async fn list_usages_for_pool(&self, pool_id: Uuid) -> Result<Vec<credit_usages::Model>> {
        let usages = credit_usages::Entity::find()
            .filter(credit_usages::Column::PoolId.eq(pool_id))
            .order_by_asc(credit_usages::Column::CreatedAt)
            .order_by_asc(credit_usages::Column::Id)
            .all(&self.db)
            .await?;

        Ok(usages)
    }
}

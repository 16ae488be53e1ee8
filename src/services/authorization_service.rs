use crate::{
    error::{LedgerError, Result},
    models::{credits::Inconsistency, order_status_ext::OrderStatusExt},
    services::credit_pool_service::CreditPoolService,
};
use anyhow::anyhow;
use entity::{credit_pools, orders, sea_orm_active_enums::OrderStatus};
use sea_orm::{entity::*, query::*, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Bridges order authorization and pool creation.
///
/// Invariant: every `authorized` order has exactly one credit pool and every
/// pool belongs to exactly one authorized order.
pub struct AuthorizationOrchestrator {
    db: DatabaseConnection,
    pools: Arc<CreditPoolService>,
}

impl AuthorizationOrchestrator {
    pub fn new(db: DatabaseConnection, pools: Arc<CreditPoolService>) -> Self {
        Self { db, pools }
    }

    /// Ensure the pool for a freshly authorized order exists, inside the
    /// transaction that performed the status change.
    ///
    /// An existing pool is returned as-is; any other failure aborts the whole
    /// authorization.
    #[instrument(skip(self, order, txn), fields(order_id = %order.id))]
    pub async fn on_order_authorized_in_txn(
        &self,
        order: &orders::Model,
        txn: &DatabaseTransaction,
    ) -> Result<credit_pools::Model> {
        if order.status != OrderStatus::Authorized {
            return Err(LedgerError::InvalidTransition(format!(
                "order {} is {}, not authorized",
                order.order_number,
                order.status.as_str()
            )));
        }

        match self.pools.create_pool_in_txn(order, txn).await {
            Ok(pool) => Ok(pool),
            Err(LedgerError::DuplicatePool(order_id)) => {
                info!(
                    order_number = %order.order_number,
                    "Order already has a credit pool; nothing to create"
                );
                CreditPoolService::find_pool_for_order(order_id, txn)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::Internal(anyhow!(
                            "Pool for order {} vanished after duplicate insert",
                            order_id
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Standalone variant: re-reads the order in a fresh transaction and
    /// creates its pool if missing. Safe to retry.
    #[instrument(skip(self))]
    pub async fn on_order_authorized(&self, order_id: Uuid) -> Result<credit_pools::Model> {
        let txn = self.db.begin().await?;

        let order = orders::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        let pool = self.on_order_authorized_in_txn(&order, &txn).await?;
        txn.commit().await?;

        Ok(pool)
    }

    /// Scan for broken authorize/pool-create pairs. Every finding is logged at
    /// error level for operator alerting.
    #[instrument(skip(self))]
    pub async fn find_inconsistencies(&self) -> Result<Vec<Inconsistency>> {
        let mut findings = Vec::new();

        let authorized = orders::Entity::find()
            .filter(orders::Column::Status.eq(OrderStatus::Authorized))
            .find_also_related(credit_pools::Entity)
            .all(&self.db)
            .await?;

        for (order, pool) in authorized {
            if pool.is_none() {
                findings.push(Inconsistency::AuthorizedWithoutPool {
                    order_id: order.id,
                    order_number: order.order_number,
                });
            }
        }

        let pools = credit_pools::Entity::find()
            .find_also_related(orders::Entity)
            .all(&self.db)
            .await?;

        for (pool, order) in pools {
            let order_status = order.map(|o| o.status);
            if order_status != Some(OrderStatus::Authorized) {
                findings.push(Inconsistency::PoolWithoutAuthorizedOrder {
                    pool_id: pool.id,
                    order_id: pool.order_id,
                    order_status,
                });
            }
        }

        for finding in &findings {
            error!(alert = true, finding = ?finding, "Ledger invariant violated");
        }

        Ok(findings)
    }

    /// Repair an authorized order that is missing its pool.
    ///
    /// A pool attached to a non-authorized order cannot be repaired
    /// automatically and is reported as `Inconsistent`.
    #[instrument(skip(self))]
    pub async fn repair(&self, order_id: Uuid) -> Result<credit_pools::Model> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        if order.status != OrderStatus::Authorized {
            return match self.pools.get_pool_for_order(order_id).await? {
                Some(pool) => Err(LedgerError::Inconsistent(format!(
                    "pool {} exists for order {} which is {}",
                    pool.id,
                    order.order_number,
                    order.status.as_str()
                ))),
                None => Err(LedgerError::InvalidTransition(format!(
                    "order {} is {}; nothing to repair",
                    order.order_number,
                    order.status.as_str()
                ))),
            };
        }

        let pool = self.on_order_authorized(order_id).await?;

        info!(
            order_number = %order.order_number,
            pool_id = %pool.id,
            "Repaired authorized order"
        );

        Ok(pool)
    }
}

use crate::{
    config::LedgerConfig,
    error::{LedgerError, Result},
    models::{
        common::Capability,
        order_status_ext::{OrderStatusExt, TransitionRule},
        orders::NewOrder,
    },
    services::{
        authorization_service::AuthorizationOrchestrator, capability_service::CapabilityProvider,
    },
    utils::{generate_order_number, generate_receipt_number},
};
use anyhow::anyhow;
use entity::{orders, sea_orm_active_enums::OrderStatus};
use sea_orm::{
    entity::*, query::*, sea_query::Expr, DatabaseConnection, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_NUMBER_ATTEMPTS: usize = 3;
const RECEIPT_NUMBER_ATTEMPTS: usize = 3;

/// Mints a receipt number from the configured prefix and the validation time
pub type ReceiptMinter = Arc<dyn Fn(&str, time::OffsetDateTime) -> String + Send + Sync>;

/// Order store plus the approval state machine
pub struct OrderService {
    db: DatabaseConnection,
    capabilities: Arc<dyn CapabilityProvider>,
    orchestrator: Arc<AuthorizationOrchestrator>,
    config: LedgerConfig,
    receipt_minter: ReceiptMinter,
}

impl OrderService {
    pub fn new(
        db: DatabaseConnection,
        capabilities: Arc<dyn CapabilityProvider>,
        orchestrator: Arc<AuthorizationOrchestrator>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            db,
            capabilities,
            orchestrator,
            config: config.clone(),
            receipt_minter: Arc::new(generate_receipt_number),
        }
    }

    pub fn with_receipt_minter(mut self, minter: ReceiptMinter) -> Self {
        self.receipt_minter = minter;
        self
    }

    /// Record a purchase intent in `pending_validation`
    #[instrument(skip(self, new_order), fields(user_id = %new_order.user_id))]
    pub async fn create_order(&self, new_order: NewOrder) -> Result<orders::Model> {
        validate_new_order(&new_order)?;

        let currency = new_order.currency.to_uppercase();
        let notes = new_order.notes.filter(|n| !n.trim().is_empty());

        // Order numbers carry a random suffix; retry the rare collision with a fresh one
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let now = time::OffsetDateTime::now_utc();
            let order_number = generate_order_number(&self.config.order_number_prefix, now);

            let order = orders::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_number: Set(order_number.clone()),
                user_id: Set(new_order.user_id.clone()),
                plan_id: Set(new_order.plan_id.clone()),
                plan_credits: Set(new_order.plan_credits),
                amount: Set(new_order.amount),
                currency: Set(currency.clone()),
                payment_method: Set(new_order.payment_method.clone()),
                status: Set(OrderStatus::PendingValidation),
                receipt_number: Set(None),
                validated_by: Set(None),
                validated_at: Set(None),
                authorized_by: Set(None),
                authorized_at: Set(None),
                cancelled_by: Set(None),
                cancelled_at: Set(None),
                notes: Set(notes.clone()),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match order.insert(&self.db).await {
                Ok(order) => {
                    info!(
                        order_id = %order.id,
                        order_number = %order.order_number,
                        plan_id = %order.plan_id,
                        credits = order.plan_credits,
                        "Created order"
                    );
                    return Ok(order);
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(attempt, order_number = %order_number, "Order number collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::Internal(anyhow!(
            "Could not mint a unique order number after {} attempts",
            ORDER_NUMBER_ATTEMPTS
        )))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<orders::Model> {
        orders::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))
    }

    pub async fn get_order_by_number(&self, order_number: &str) -> Result<orders::Model> {
        orders::Entity::find()
            .filter(orders::Column::OrderNumber.eq(order_number))
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_number.to_string()))
    }

    /// A buyer's orders, newest first
    pub async fn list_orders_for_user(&self, user_id: &str) -> Result<Vec<orders::Model>> {
        let orders = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(orders)
    }

    /// Work queue for cashiers/admins, oldest first
    #[instrument(skip(self))]
    pub async fn list_orders_by_status(
        &self,
        status: OrderStatus,
        actor_id: &str,
    ) -> Result<Vec<orders::Model>> {
        self.capabilities.require(actor_id, Capability::Cashier).await?;

        let orders = orders::Entity::find()
            .filter(orders::Column::Status.eq(status))
            .order_by_asc(orders::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(orders)
    }

    /// Move an order to `target`, stamping who did it and when.
    ///
    /// The status write is guarded on the status that was checked, so a
    /// concurrent transition makes this one fail with `InvalidTransition`
    /// instead of overwriting it. Authorizing creates the order's credit pool
    /// in the same transaction; if that fails the status change is rolled back.
    #[instrument(skip(self, notes))]
    pub async fn transition(
        &self,
        order_id: Uuid,
        target: OrderStatus,
        actor_id: &str,
        notes: Option<&str>,
    ) -> Result<orders::Model> {
        if actor_id.is_empty() {
            return Err(LedgerError::BadRequest("actor id is required".to_string()));
        }

        let order = self.get_order(order_id).await?;

        let rule = order.status.transition_rule(target).ok_or_else(|| {
            LedgerError::InvalidTransition(format!(
                "order {} cannot move from {} to {}",
                order.order_number,
                order.status.as_str(),
                target.as_str()
            ))
        })?;

        let permitted = match rule {
            TransitionRule::Requires(capability) => {
                self.capabilities.has_capability(actor_id, capability).await?
            }
            TransitionRule::BuyerOr(capability) => {
                order.user_id == actor_id
                    || self.capabilities.has_capability(actor_id, capability).await?
            }
        };

        if !permitted {
            return Err(LedgerError::PermissionDenied(format!(
                "actor {} may not move order {} to {}",
                actor_id,
                order.order_number,
                target.as_str()
            )));
        }

        // Receipt numbers carry a random suffix; a collision rolls back and retries with a fresh one
        for attempt in 1..=RECEIPT_NUMBER_ATTEMPTS {
            match self.apply_transition(&order, target, actor_id, notes).await {
                Err(LedgerError::Database(e))
                    if target == OrderStatus::Validated
                        && matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    warn!(
                        attempt,
                        order_number = %order.order_number,
                        "Receipt number collision, regenerating"
                    );
                }
                result => return result,
            }
        }

        Err(LedgerError::Internal(anyhow!(
            "Could not mint a unique receipt number after {} attempts",
            RECEIPT_NUMBER_ATTEMPTS
        )))
    }

    /// One attempt at the guarded status write, in its own transaction
    async fn apply_transition(
        &self,
        order: &orders::Model,
        target: OrderStatus,
        actor_id: &str,
        notes: Option<&str>,
    ) -> Result<orders::Model> {
        let now = time::OffsetDateTime::now_utc();
        let actor = Some(actor_id.to_string());

        let mut update = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(target))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now));

        update = match target {
            OrderStatus::Validated => update
                .col_expr(orders::Column::ValidatedBy, Expr::value(actor))
                .col_expr(orders::Column::ValidatedAt, Expr::value(Some(now)))
                .col_expr(
                    orders::Column::ReceiptNumber,
                    Expr::value(Some((self.receipt_minter)(
                        &self.config.receipt_number_prefix,
                        now,
                    ))),
                ),
            OrderStatus::Authorized => update
                .col_expr(orders::Column::AuthorizedBy, Expr::value(actor))
                .col_expr(orders::Column::AuthorizedAt, Expr::value(Some(now))),
            OrderStatus::Cancelled => update
                .col_expr(orders::Column::CancelledBy, Expr::value(actor))
                .col_expr(orders::Column::CancelledAt, Expr::value(Some(now))),
            OrderStatus::PendingValidation | OrderStatus::Expired => update,
        };

        if let Some(merged) = merge_notes(order.notes.as_deref(), notes) {
            update = update.col_expr(orders::Column::Notes, Expr::value(Some(merged)));
        }

        let txn = self.db.begin().await?;

        let result = update
            .filter(orders::Column::Id.eq(order.id))
            .filter(orders::Column::Status.eq(order.status))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(LedgerError::InvalidTransition(format!(
                "order {} changed concurrently; re-fetch its current status",
                order.order_number
            )));
        }

        let updated = orders::Entity::find_by_id(order.id)
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order.id.to_string()))?;

        if target == OrderStatus::Authorized {
            let pool = self
                .orchestrator
                .on_order_authorized_in_txn(&updated, &txn)
                .await?;

            info!(
                order_number = %updated.order_number,
                pool_id = %pool.id,
                credits = pool.total_credits,
                "Authorized order and granted credits"
            );
        }

        txn.commit().await?;

        info!(
            order_number = %updated.order_number,
            from = order.status.as_str(),
            to = target.as_str(),
            actor_id = actor_id,
            "Order transitioned"
        );

        Ok(updated)
    }

    /// Expire every pending or validated order created before `cutoff`.
    /// Authorized orders are never touched.
    #[instrument(skip(self))]
    pub async fn expire_stale_orders(&self, cutoff: time::OffsetDateTime) -> Result<u64> {
        let now = time::OffsetDateTime::now_utc();

        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Expired))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(
                orders::Column::Status
                    .is_in([OrderStatus::PendingValidation, OrderStatus::Validated]),
            )
            .filter(orders::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(expired = result.rows_affected, "Expired stale orders");
        }

        Ok(result.rows_affected)
    }
}

fn validate_new_order(new_order: &NewOrder) -> Result<()> {
    if new_order.user_id.trim().is_empty() {
        return Err(LedgerError::BadRequest("buyer id is required".to_string()));
    }
    if new_order.plan_id.trim().is_empty() {
        return Err(LedgerError::BadRequest("plan id is required".to_string()));
    }
    if new_order.plan_credits <= 0 {
        return Err(LedgerError::BadRequest(format!(
            "plan credits must be positive, got {}",
            new_order.plan_credits
        )));
    }
    if new_order.amount < 0 {
        return Err(LedgerError::BadRequest(
            "amount cannot be negative".to_string(),
        ));
    }
    if new_order.currency.len() != 3 || !new_order.currency.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(LedgerError::BadRequest(format!(
            "currency must be a 3-letter code, got {:?}",
            new_order.currency
        )));
    }
    if new_order.payment_method.trim().is_empty() {
        return Err(LedgerError::BadRequest(
            "payment method is required".to_string(),
        ));
    }

    Ok(())
}

/// Append new notes to existing ones, one entry per line
fn merge_notes(existing: Option<&str>, new: Option<&str>) -> Option<String> {
    let new = new.map(str::trim).filter(|n| !n.is_empty())?;

    Some(match existing {
        Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, new),
        _ => new.to_string(),
    })
}

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{LedgerError, Result},
    middleware::ActorIdentity,
    models::{
        common::Capability,
        credits::{CreditPoolResponse, DeactivatePoolRequest, Inconsistency, UsageReceiptResponse},
    },
};

/// POST /api/v1/admin/pools/{pool_id}/deactivate
///
/// Administrative reversal (e.g. refund); remaining credits become unusable
#[instrument(skip(state, request))]
pub async fn deactivate_pool(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Path(pool_id): Path<Uuid>,
    Json(request): Json<DeactivatePoolRequest>,
) -> Result<Json<CreditPoolResponse>> {
    request
        .validate()
        .map_err(|e| LedgerError::BadRequest(format!("Validation error: {}", e)))?;

    let pool = state
        .pool_service
        .deactivate_pool(pool_id, &identity.actor_id, request.reason.as_deref())
        .await?;

    Ok(Json(pool.into()))
}

/// GET /api/v1/admin/pools/{pool_id}/usages
#[instrument(skip(state))]
pub async fn pool_usages(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Path(pool_id): Path<Uuid>,
) -> Result<Json<Vec<UsageReceiptResponse>>> {
    state
        .capabilities
        .require(&identity.actor_id, Capability::Admin)
        .await?;

    // 404 for unknown pools rather than an empty list
    state.pool_service.get_pool(pool_id).await?;
    let usages = state.pool_service.list_usages_for_pool(pool_id).await?;

    Ok(Json(usages.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/admin/reconciliation
#[instrument(skip(state))]
pub async fn reconciliation_report(
    State(state): State<AppState>,
    identity: ActorIdentity,
) -> Result<Json<Vec<Inconsistency>>> {
    state
        .capabilities
        .require(&identity.actor_id, Capability::Admin)
        .await?;

    let findings = state.orchestrator.find_inconsistencies().await?;

    Ok(Json(findings))
}

/// POST /api/v1/admin/reconciliation/{order_id}/repair
#[instrument(skip(state))]
pub async fn repair_order(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CreditPoolResponse>> {
    state
        .capabilities
        .require(&identity.actor_id, Capability::Admin)
        .await?;

    let pool = state.orchestrator.repair(order_id).await?;

    Ok(Json(pool.into()))
}

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{LedgerError, Result},
    middleware::ActorIdentity,
    models::credits::{ConsumeRequest, CreditPoolResponse, CreditStatus, UsageReceiptResponse},
};

/// GET /api/v1/credits/pools
///
/// The caller's pools in FIFO order
#[instrument(skip(state))]
pub async fn list_pools(
    State(state): State<AppState>,
    identity: ActorIdentity,
) -> Result<Json<Vec<CreditPoolResponse>>> {
    let pools = state
        .pool_service
        .list_pools_for_user(&identity.actor_id)
        .await?;

    Ok(Json(pools.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/credits/status
#[instrument(skip(state))]
pub async fn credit_status(
    State(state): State<AppState>,
    identity: ActorIdentity,
) -> Result<Json<CreditStatus>> {
    let status = state
        .consumption_service
        .get_credit_status(&identity.actor_id)
        .await?;

    Ok(Json(status))
}

/// POST /api/v1/credits/consume
///
/// Debits one credit from the caller's oldest eligible pool
#[instrument(skip(state, request))]
pub async fn consume_credit(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Json(request): Json<ConsumeRequest>,
) -> Result<Json<UsageReceiptResponse>> {
    request
        .validate()
        .map_err(|e| LedgerError::BadRequest(format!("Validation error: {}", e)))?;

    let receipt = state
        .consumption_service
        .consume(&identity.actor_id, &request.subject_id, &request.label)
        .await?;

    Ok(Json(receipt.into()))
}

/// GET /api/v1/credits/receipts/{subject_id}
///
/// Re-query hook for callers whose consume call had an unknown outcome
#[instrument(skip(state))]
pub async fn receipts_for_subject(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Path(subject_id): Path<String>,
) -> Result<Json<Vec<UsageReceiptResponse>>> {
    let receipts = state
        .consumption_service
        .receipts_for_subject(&identity.actor_id, &subject_id)
        .await?;

    Ok(Json(receipts.into_iter().map(Into::into).collect()))
}

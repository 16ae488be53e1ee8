use axum::{
    extract::{Path, State},
    Json,
};
use entity::sea_orm_active_enums::OrderStatus;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{LedgerError, Result},
    middleware::ActorIdentity,
    models::{
        common::Capability,
        orders::{CreateOrderRequest, OrderResponse, TransitionRequest},
    },
};

/// POST /api/v1/orders
///
/// The caller is recorded as the buyer.
#[instrument(skip(state, request))]
pub async fn create_order(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>> {
    request
        .validate()
        .map_err(|e| LedgerError::BadRequest(format!("Validation error: {}", e)))?;

    let order = state
        .order_service
        .create_order(request.into_new_order(&identity.actor_id))
        .await?;

    Ok(Json(order.into()))
}

/// GET /api/v1/orders
#[instrument(skip(state))]
pub async fn list_my_orders(
    State(state): State<AppState>,
    identity: ActorIdentity,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = state
        .order_service
        .list_orders_for_user(&identity.actor_id)
        .await?;

    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/orders/queue/{status}
///
/// Cashier/admin work queue, oldest first
#[instrument(skip(state))]
pub async fn order_queue(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Path(status): Path<OrderStatus>,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = state
        .order_service
        .list_orders_by_status(status, &identity.actor_id)
        .await?;

    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/orders/{order_id}
///
/// Visible to the buyer and to cashiers/admins
#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>> {
    let order = state.order_service.get_order(order_id).await?;

    if order.user_id != identity.actor_id {
        state
            .capabilities
            .require(&identity.actor_id, Capability::Cashier)
            .await?;
    }

    Ok(Json(order.into()))
}

/// POST /api/v1/orders/{order_id}/transition
///
/// Request body:
/// ```json
/// { "targetStatus": "validated", "notes": "paid at counter 2" }
/// ```
#[instrument(skip(state, request))]
pub async fn transition_order(
    State(state): State<AppState>,
    identity: ActorIdentity,
    Path(order_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<OrderResponse>> {
    request
        .validate()
        .map_err(|e| LedgerError::BadRequest(format!("Validation error: {}", e)))?;

    let order = state
        .order_service
        .transition(
            order_id,
            request.target_status,
            &identity.actor_id,
            request.notes.as_deref(),
        )
        .await?;

    Ok(Json(order.into()))
}

// Route modules
pub mod admin;
pub mod credits;
pub mod orders;

use crate::{app_state::AppState, middleware::jwt_auth_middleware};
use axum::{
    http::HeaderName,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .with_state(state)
}

/// API v1 routes; every route requires a bearer token
fn api_v1_routes(state: AppState) -> Router<AppState> {
    let order_routes = Router::new()
        .route("/orders", post(orders::create_order).get(orders::list_my_orders))
        .route("/orders/queue/{status}", get(orders::order_queue))
        .route("/orders/{order_id}", get(orders::get_order))
        .route("/orders/{order_id}/transition", post(orders::transition_order));

    let credit_routes = Router::new()
        .route("/credits/pools", get(credits::list_pools))
        .route("/credits/status", get(credits::credit_status))
        .route("/credits/consume", post(credits::consume_credit))
        .route("/credits/receipts/{subject_id}", get(credits::receipts_for_subject));

    let admin_routes = Router::new()
        .route("/admin/pools/{pool_id}/deactivate", post(admin::deactivate_pool))
        .route("/admin/pools/{pool_id}/usages", get(admin::pool_usages))
        .route("/admin/reconciliation", get(admin::reconciliation_report))
        .route(
            "/admin/reconciliation/{order_id}/repair",
            post(admin::repair_order),
        );

    Router::new()
        .merge(order_routes)
        .merge(credit_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

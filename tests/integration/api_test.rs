use crate::common::{setup_test_db, unique_user, ADMIN, CASHIER};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use credit_ledger::{
    config::{AuthConfig, Config, DatabaseConfig, LedgerConfig, RolesConfig, ServerConfig},
    routes::create_router,
    services::StaticCapabilities,
    AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> (Router, AppState) {
    let db = setup_test_db().await;

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "sqlite://unused?mode=rwc".to_string(),
            run_migrations: false,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_expiration_minutes: 60,
        },
        ledger: LedgerConfig::default(),
        roles: RolesConfig::default(),
    };

    let state = AppState::with_capabilities(
        db,
        config,
        Arc::new(StaticCapabilities::new([ADMIN], [CASHIER])),
    );

    (create_router(state.clone()), state)
}

async fn call(
    app: &Router,
    state: &AppState,
    actor: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(actor) = actor {
        let token = state.jwt_service.generate_token(actor).unwrap();
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let (app, state) = test_app().await;

    let (status, body) = call(&app, &state, None, "GET", "/api/v1/credits/status", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_purchase_to_consumption_over_http() {
    let (app, state) = test_app().await;
    let buyer = unique_user();

    let (status, order) = call(
        &app,
        &state,
        Some(&buyer),
        "POST",
        "/api/v1/orders",
        Some(json!({
            "planId": "starter",
            "planCredits": 2,
            "amount": 5000,
            "currency": "xof",
            "paymentMethod": "cash"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "pending_validation");
    assert_eq!(order["userId"], buyer.as_str());
    assert_eq!(order["currency"], "XOF");
    let order_id = order["orderId"].as_str().unwrap().to_string();
    let transition_uri = format!("/api/v1/orders/{}/transition", order_id);

    // Buyers do not see the cashier queue
    let (status, _) = call(
        &app,
        &state,
        Some(&buyer),
        "GET",
        "/api/v1/orders/queue/pending_validation",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nothing to spend yet
    let consume = json!({ "subjectId": "declaration-1", "label": "duty estimate" });
    let (status, body) = call(
        &app,
        &state,
        Some(&buyer),
        "POST",
        "/api/v1/credits/consume",
        Some(consume.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"]["code"], "NO_CREDITS_AVAILABLE");

    // Skipping validation is rejected
    let (status, body) = call(
        &app,
        &state,
        Some(ADMIN),
        "POST",
        &transition_uri,
        Some(json!({ "targetStatus": "authorized" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let (status, body) = call(
        &app,
        &state,
        Some(CASHIER),
        "POST",
        &transition_uri,
        Some(json!({ "targetStatus": "validated", "notes": "cash received" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validatedBy"], CASHIER);

    let (status, body) = call(
        &app,
        &state,
        Some(CASHIER),
        "POST",
        &transition_uri,
        Some(json!({ "targetStatus": "authorized" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "PERMISSION_DENIED");

    let (status, body) = call(
        &app,
        &state,
        Some(ADMIN),
        "POST",
        &transition_uri,
        Some(json!({ "targetStatus": "authorized" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "authorized");

    let (status, pools) = call(&app, &state, Some(&buyer), "GET", "/api/v1/credits/pools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pools.as_array().unwrap().len(), 1);
    assert_eq!(pools[0]["status"], "unused");
    let pool_id = pools[0]["poolId"].as_str().unwrap().to_string();

    let (status, receipt) = call(
        &app,
        &state,
        Some(&buyer),
        "POST",
        "/api/v1/credits/consume",
        Some(consume),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["poolId"], pool_id.as_str());
    assert_eq!(receipt["orderId"], order_id.as_str());

    let (status, credit_status) =
        call(&app, &state, Some(&buyer), "GET", "/api/v1/credits/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(credit_status["totalCredits"], 2);
    assert_eq!(credit_status["remainingCredits"], 1);
    assert_eq!(credit_status["usedCredits"], 1);

    let (status, receipts) = call(
        &app,
        &state,
        Some(&buyer),
        "GET",
        "/api/v1/credits/receipts/declaration-1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipts.as_array().unwrap().len(), 1);

    // Admin-only surface
    let usages_uri = format!("/api/v1/admin/pools/{}/usages", pool_id);
    let (status, _) = call(&app, &state, Some(&buyer), "GET", &usages_uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, usages) = call(&app, &state, Some(ADMIN), "GET", &usages_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usages.as_array().unwrap().len(), 1);

    let (status, pool) = call(
        &app,
        &state,
        Some(ADMIN),
        "POST",
        &format!("/api/v1/admin/pools/{}/deactivate", pool_id),
        Some(json!({ "reason": "refund" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pool["status"], "inactive");

    let (status, _) = call(
        &app,
        &state,
        Some(&buyer),
        "POST",
        "/api/v1/credits/consume",
        Some(json!({ "subjectId": "declaration-2", "label": "duty estimate" })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_reconciliation_report_is_admin_only() {
    let (app, state) = test_app().await;

    let (status, _) = call(
        &app,
        &state,
        Some(CASHIER),
        "GET",
        "/api/v1/admin/reconciliation",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        &state,
        Some(ADMIN),
        "GET",
        "/api/v1/admin/reconciliation",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}

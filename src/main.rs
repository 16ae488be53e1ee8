use credit_ledger::{routes::create_router, AppState, Config};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,credit_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting credit ledger");

    let config = Config::load()?;

    tracing::info!(
        "Loaded configuration - Server: {}:{}",
        config.server.host,
        config.server.port
    );

    let state = AppState::new(config.clone()).await?;

    tracing::info!("Initialized application state");

    if let Some(ttl_hours) = config.ledger.pending_order_ttl_hours {
        spawn_expiry_sweeper(
            state.clone(),
            time::Duration::hours(i64::from(ttl_hours)),
            Duration::from_secs(config.ledger.expiry_sweep_interval_minutes.max(1) * 60),
        );
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically expire orders that never made it through the approval chain
fn spawn_expiry_sweeper(state: AppState, ttl: time::Duration, every: Duration) {
    let orders = Arc::clone(&state.order_service);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let cutoff = time::OffsetDateTime::now_utc() - ttl;
            if let Err(e) = orders.expire_stale_orders(cutoff).await {
                tracing::warn!(error = %e, transient = e.is_transient(), "Order expiry sweep failed");
            }
        }
    });

    tracing::info!(ttl_hours = ttl.whole_hours(), "Order expiry sweeper started");
}

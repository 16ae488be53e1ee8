use crate::{
    config::Config,
    services::{
        AuthorizationOrchestrator, CapabilityProvider, ConsumptionService, CreditPoolService,
        JWTService, LedgerServices, OrderService, StaticCapabilities,
    },
};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub order_service: Arc<OrderService>,
    pub pool_service: Arc<CreditPoolService>,
    pub consumption_service: Arc<ConsumptionService>,
    pub orchestrator: Arc<AuthorizationOrchestrator>,
    pub capabilities: Arc<dyn CapabilityProvider>,
    pub jwt_service: Arc<JWTService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db = sea_orm::Database::connect(&config.database.url).await?;

        if config.database.run_migrations {
            Migrator::up(&db, None).await?;
            tracing::info!("Applied pending migrations");
        }

        let capabilities: Arc<dyn CapabilityProvider> =
            Arc::new(StaticCapabilities::from_config(&config.roles));

        Ok(Self::with_capabilities(db, config, capabilities))
    }

    /// Build state around an existing connection and identity collaborator
    pub fn with_capabilities(
        db: DatabaseConnection,
        config: Config,
        capabilities: Arc<dyn CapabilityProvider>,
    ) -> Self {
        let ledger = LedgerServices::new(db.clone(), capabilities, &config.ledger);
        let jwt_service = Arc::new(JWTService::new(Arc::new(config.auth.clone())));

        Self {
            db,
            order_service: ledger.orders,
            pool_service: ledger.pools,
            consumption_service: ledger.consumption,
            orchestrator: ledger.orchestrator,
            capabilities: ledger.capabilities,
            jwt_service,
            config: Arc::new(config),
        }
    }
}

// Service modules
pub mod authorization_service;
pub mod capability_service;
pub mod consumption_service;
pub mod credit_pool_service;
pub mod jwt_service;
pub mod order_service;

pub use authorization_service::AuthorizationOrchestrator;
pub use capability_service::{CapabilityProvider, StaticCapabilities};
pub use consumption_service::ConsumptionService;
pub use credit_pool_service::CreditPoolService;
pub use jwt_service::JWTService;
pub use order_service::OrderService;

use crate::config::LedgerConfig;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// The ledger core, wired against one store handle
#[derive(Clone)]
pub struct LedgerServices {
    pub orders: Arc<OrderService>,
    pub pools: Arc<CreditPoolService>,
    pub consumption: Arc<ConsumptionService>,
    pub orchestrator: Arc<AuthorizationOrchestrator>,
    pub capabilities: Arc<dyn CapabilityProvider>,
}

impl LedgerServices {
    pub fn new(
        db: DatabaseConnection,
        capabilities: Arc<dyn CapabilityProvider>,
        config: &LedgerConfig,
    ) -> Self {
        let pools = Arc::new(CreditPoolService::new(db.clone(), capabilities.clone()));
        let orchestrator = Arc::new(AuthorizationOrchestrator::new(db.clone(), pools.clone()));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            capabilities.clone(),
            orchestrator.clone(),
            config,
        ));
        let consumption = Arc::new(ConsumptionService::new(db, config.consume_max_attempts));

        Self {
            orders,
            pools,
            consumption,
            orchestrator,
            capabilities,
        }
    }
}

//! Capability port onto the external identity/role store
//!
//! The ledger never embeds role logic; it asks a `CapabilityProvider` what an
//! actor may do. `StaticCapabilities` backs the port from configuration.

use crate::{
    config::RolesConfig,
    error::{LedgerError, Result},
    models::common::Capability,
};
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Highest capability held by the actor
    async fn capability_of(&self, actor_id: &str) -> Result<Capability>;

    async fn has_capability(&self, actor_id: &str, required: Capability) -> Result<bool> {
        Ok(self.capability_of(actor_id).await?.satisfies(required))
    }

    /// Fails with `PermissionDenied` unless the actor holds `required`
    async fn require(&self, actor_id: &str, required: Capability) -> Result<()> {
        if self.has_capability(actor_id, required).await? {
            Ok(())
        } else {
            Err(LedgerError::PermissionDenied(format!(
                "{} capability required",
                required.as_str()
            )))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities {
    admins: HashSet<String>,
    cashiers: HashSet<String>,
}

impl StaticCapabilities {
    pub fn new<A, C>(admins: A, cashiers: C) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
            cashiers: cashiers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(roles: &RolesConfig) -> Self {
        Self::new(roles.admins.iter().cloned(), roles.cashiers.iter().cloned())
    }
}

#[async_trait]
impl CapabilityProvider for StaticCapabilities {
    async fn capability_of(&self, actor_id: &str) -> Result<Capability> {
        let capability = if self.admins.contains(actor_id) {
            Capability::Admin
        } else if self.cashiers.contains(actor_id) {
            Capability::Cashier
        } else {
            Capability::None
        };

        Ok(capability)
    }
}

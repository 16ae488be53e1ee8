use serde::{Deserialize, Serialize};

/// Capability an actor holds, as resolved by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Admin,
    Cashier,
    None,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Cashier => "cashier",
            Self::None => "none",
        }
    }

    /// Admin covers everything a cashier may do.
    pub fn satisfies(&self, required: Capability) -> bool {
        match (self, required) {
            (_, Capability::None) => true,
            (Capability::Admin, _) => true,
            (Capability::Cashier, Capability::Cashier) => true,
            _ => false,
        }
    }
}

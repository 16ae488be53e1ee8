use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Apply pending migrations at startup
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_order_number_prefix")]
    pub order_number_prefix: String,
    #[serde(default = "default_receipt_number_prefix")]
    pub receipt_number_prefix: String,
    /// How many FIFO candidates a single consume may try after losing a race
    #[serde(default = "default_consume_max_attempts")]
    pub consume_max_attempts: u32,
    /// Orders left pending/validated longer than this are expired by the sweeper.
    /// Unset disables the sweeper.
    #[serde(default)]
    pub pending_order_ttl_hours: Option<u32>,
    #[serde(default = "default_expiry_sweep_interval_minutes")]
    pub expiry_sweep_interval_minutes: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            order_number_prefix: default_order_number_prefix(),
            receipt_number_prefix: default_receipt_number_prefix(),
            consume_max_attempts: default_consume_max_attempts(),
            pending_order_ttl_hours: None,
            expiry_sweep_interval_minutes: default_expiry_sweep_interval_minutes(),
        }
    }
}

fn default_order_number_prefix() -> String {
    "ORD".to_string()
}

fn default_receipt_number_prefix() -> String {
    "RCP".to_string()
}

fn default_consume_max_attempts() -> u32 {
    5
}

fn default_expiry_sweep_interval_minutes() -> u64 {
    60
}

/// Static capability assignments, used when no external identity store is wired in
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub cashiers: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("CREDIT_LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Connection configuration for the backend database.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// PostgreSQL connection string.
    pub connection_string: String,
    /// Application name visible in `pg_stat_activity`.
    pub application_name: String,
    /// Maximum pooled connections for statements.
    pub pool_size: usize,
    /// Schema holding the session helper functions.
    pub private_schema: String,
    /// Delay between listener reconnect attempts.
    pub reconnect_interval: std::time::Duration,
}

impl ConnectorConfig {
    /// Build from the shared SluiceConfig.
    pub fn from_sluice_config(cfg: &shared::config::SluiceConfig) -> Self {
        Self {
            connection_string: cfg.database.connection_string.clone(),
            application_name: cfg.database.application_name.clone(),
            pool_size: cfg.database.pool_size,
            private_schema: cfg.database.private_schema.clone(),
            reconnect_interval: std::time::Duration::from_secs(
                cfg.database.reconnect_interval_secs,
            ),
        }
    }
}

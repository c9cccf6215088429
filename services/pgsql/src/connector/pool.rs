use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

use super::config::ConnectorConfig;

/// Build the statement pool.
///
/// Connections are opened lazily on first checkout, so this succeeds even
/// while the database is down.
pub fn create_pool(config: &ConnectorConfig) -> anyhow::Result<Pool> {
  let mut cfg = Config::new();
  cfg.url = Some(config.connection_string.clone());
  cfg.application_name = Some(config.application_name.clone());
  cfg.pool = Some(PoolConfig::new(config.pool_size));
  cfg.manager = Some(ManagerConfig {
    recycling_method: RecyclingMethod::Fast,
  });

  let pool = cfg
    .create_pool(Some(Runtime::Tokio1), NoTls)
    .map_err(|e| anyhow::anyhow!("failed to create pool: {}", e))?;

  info!(
    app_name = %config.application_name,
    max_size = config.pool_size,
    "connection pool created"
  );

  Ok(pool)
}

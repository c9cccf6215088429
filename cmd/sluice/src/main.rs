use shared::config::{self, SluiceConfig};
use sluice_core::daemon::{Lifecycle, LifecycleState, RuntimeConfig};
use sluice_http::auth::IssuerRegistry;
use sluice_http::{GatewayServer, Services};
use sluice_pgsql::{create_pool, ConnectorConfig, DatabaseListener, PgExecutor};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
  // A missing .env is fine; the environment may already be set.
  let _ = dotenvy::dotenv();

  let env = std::env::var("SLUICE_ENV").unwrap_or_else(|_| "development".to_string());
  let cfg = config::load_config(Path::new("config"), &env)?;

  init_logging(&cfg.observability.log_level);
  info!(env = %env, "configuration loaded");

  let rt = RuntimeConfig::with_workers(cfg.server.worker_threads).build_runtime()?;
  rt.block_on(run_gateway(cfg))
}

async fn run_gateway(cfg: SluiceConfig) -> anyhow::Result<()> {
  let mut lifecycle = Lifecycle::new();

  let connector = ConnectorConfig::from_sluice_config(&cfg);
  let pool = create_pool(&connector)?;
  let executor = Arc::new(PgExecutor::new(pool, connector.private_schema.clone()));
  info!(pool_size = executor.pool_size(), "connection pool created");

  let listener = DatabaseListener::new(connector);
  let listener_task = tokio::spawn(listener.clone().run());

  let issuers = IssuerRegistry::from_config(&cfg.issuers)?;
  let services = Arc::new(Services {
    executor,
    relay: listener,
    issuers,
    verbose: cfg.observability.verbose,
  });

  let gateway = GatewayServer::from_config(&cfg, services).await?;

  lifecycle.transition(LifecycleState::Running);
  gateway
    .serve(async {
      Lifecycle::wait_for_shutdown().await;
    })
    .await;

  lifecycle.transition(LifecycleState::ShuttingDown);
  listener_task.abort();

  lifecycle.transition(LifecycleState::Stopped);
  info!("sluice stopped");
  Ok(())
}

fn init_logging(default_level: &str) {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_thread_ids(true)
    .init();
}

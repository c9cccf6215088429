//! PostgreSQL backend for the sluice gateway.

pub mod connector;
pub mod error;
pub mod executor;
pub mod listener;
pub mod sqlstate;

pub use connector::{create_pool, ConnectorConfig, PgClient};
pub use executor::PgExecutor;
pub use listener::DatabaseListener;

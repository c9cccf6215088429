pub mod client;
pub mod config;
pub mod pool;

pub use client::PgClient;
pub use config::ConnectorConfig;
pub use pool::create_pool;

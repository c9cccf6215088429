use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::error::SluiceError;

/// Root configuration for the sluice gateway.
///
/// Loaded from TOML files via the `config` crate with environment-variable
/// overrides (prefix: `SLUICE_`).
#[derive(Debug, Clone, Deserialize)]
pub struct SluiceConfig {
    /// WebSocket listener settings.
    pub server: ServerConfig,
    /// Backend database settings.
    pub database: DatabaseConfig,
    /// Endpoints served, keyed by request path.
    pub endpoints: Vec<EndpointConfig>,
    /// Trusted token issuers keyed by issuer name.
    #[serde(default)]
    pub issuers: HashMap<String, IssuerConfig>,
    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// WebSocket listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g. `0.0.0.0:8080`).
    pub listen_addr: String,
    /// Take the client address from the last `X-Forwarded-For` entry.
    #[serde(default)]
    pub trust_x_forwarded_for: bool,
    /// Tokio worker threads. Defaults to the number of cores.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

/// Backend database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub connection_string: String,
    /// Maximum number of pooled connections used for statements.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Application name shown in `pg_stat_activity`.
    #[serde(default = "default_app_name")]
    pub application_name: String,
    /// Schema holding the `restore_session` and
    /// `get_canonical_representations` helper functions.
    #[serde(default = "default_private_schema")]
    pub private_schema: String,
    /// Delay between attempts to re-establish the listener connection.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_secs: u64,
}

/// A single endpoint and the schemas its clients may address.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Request path, e.g. `/ws/app`.
    pub path: String,
    /// Schemas that requests on this endpoint may name.
    pub acceptable_schemas: Vec<String>,
}

/// A trusted token issuer.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    /// Signature algorithm (`RS256`, `ES256`, `EdDSA`, ...).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Path to the PEM-encoded public key.
    pub public_key_path: String,
    /// Accepted `aud` values. When unset the audience is not checked.
    pub audience: Option<Vec<String>>,
    /// Clock skew tolerance in seconds.
    #[serde(default)]
    pub leeway_secs: u64,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter (e.g. `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log the full error chain for client-attributable failures.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            verbose: false,
        }
    }
}

impl SluiceConfig {
    /// Check invariants the deserializer cannot express.
    pub fn validate(&self) -> Result<(), SluiceError> {
        if self.endpoints.is_empty() {
            return Err(invalid("endpoints", "at least one endpoint is required"));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if !endpoint.path.starts_with('/') {
                return Err(invalid("endpoints.path", "paths must start with '/'"));
            }
            if !seen.insert(endpoint.path.as_str()) {
                return Err(invalid(
                    "endpoints.path",
                    &format!("duplicate endpoint path {}", endpoint.path),
                ));
            }
            if endpoint.acceptable_schemas.is_empty() {
                return Err(invalid(
                    "endpoints.acceptable_schemas",
                    &format!("endpoint {} lists no schemas", endpoint.path),
                ));
            }
        }

        if self.database.pool_size == 0 {
            return Err(invalid("database.pool_size", "must be at least 1"));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> SluiceError {
    SluiceError::ConfigInvalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

// ── Default value functions ─────────────────────────────────────────

fn default_pool_size() -> usize {
    8
}
fn default_app_name() -> String {
    "sluice".to_string()
}
fn default_private_schema() -> String {
    "sluice_private".to_string()
}
fn default_reconnect_interval() -> u64 {
    5
}
fn default_algorithm() -> String {
    "RS256".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

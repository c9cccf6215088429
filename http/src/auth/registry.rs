use shared::config::IssuerConfig;
use shared::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::{ClaimSet, JwtIssuer};

/// Turns a bearer token into a validated claim set.
pub trait ClaimsDecoder: Send + Sync {
  /// Fails with a client error for malformed, forged or expired tokens.
  fn decode(&self, token: &str) -> Result<ClaimSet>;
}

/// Trusted issuers by name.
#[derive(Default, Clone)]
pub struct IssuerRegistry {
  issuers: HashMap<String, Arc<dyn ClaimsDecoder>>,
}

impl IssuerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a JWT issuer for every configured entry.
  pub fn from_config(issuers: &HashMap<String, IssuerConfig>) -> anyhow::Result<Self> {
    let mut registry = Self::new();
    for (name, cfg) in issuers {
      registry.insert(name, Arc::new(JwtIssuer::from_config(name, cfg)?));
      info!(issuer = %name, algorithm = %cfg.algorithm, "token issuer registered");
    }
    Ok(registry)
  }

  pub fn insert(&mut self, name: &str, decoder: Arc<dyn ClaimsDecoder>) {
    self.issuers.insert(name.to_string(), decoder);
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn ClaimsDecoder>> {
    self.issuers.get(name).cloned()
  }
}

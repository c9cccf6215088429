use shared::config::{EndpointConfig, SluiceConfig};
use sluice_core::backend::{Executor, NotificationRelay};
use sluice_core::operation::AllowedSchemas;
use std::sync::Arc;

use crate::auth::IssuerRegistry;

/// Process-wide collaborators shared by every session.
pub struct Services {
  pub executor: Arc<dyn Executor>,
  pub relay: Arc<dyn NotificationRelay>,
  pub issuers: IssuerRegistry,
  /// Log client-attributable failures with their full error chain.
  pub verbose: bool,
}

/// One served path and the schemas its clients may address.
#[derive(Debug, Clone)]
pub struct Endpoint {
  pub path: String,
  pub schemas: AllowedSchemas,
}

impl Endpoint {
  pub fn new<I, S>(path: impl Into<String>, schemas: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      path: path.into(),
      schemas: AllowedSchemas::new(schemas),
    }
  }

  pub fn from_config(cfg: &EndpointConfig) -> Self {
    Self::new(cfg.path.clone(), cfg.acceptable_schemas.iter().cloned())
  }

  /// Every endpoint named in the configuration.
  pub fn all_from_config(cfg: &SluiceConfig) -> Vec<Arc<Endpoint>> {
    cfg
      .endpoints
      .iter()
      .map(|e| Arc::new(Self::from_config(e)))
      .collect()
  }
}

//! WebSocket listener.
//!
//! The handshake path picks the [`Endpoint`]; each accepted socket then
//! runs as one session task until either side closes it.

mod connection;
mod server;

pub use server::GatewayServer;

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{Endpoint, Services};

/// Maps handshake paths to endpoints and carries what every connection
/// needs.
pub(crate) struct Router {
  endpoints: HashMap<String, Arc<Endpoint>>,
  services: Arc<Services>,
  trust_forwarded: bool,
}

impl Router {
  pub(crate) fn new(
    endpoints: impl IntoIterator<Item = Arc<Endpoint>>,
    services: Arc<Services>,
    trust_forwarded: bool,
  ) -> Self {
    Self {
      endpoints: endpoints
        .into_iter()
        .map(|e| (e.path.clone(), e))
        .collect(),
      services,
      trust_forwarded,
    }
  }

  pub(crate) fn route(&self, path: &str) -> Option<Arc<Endpoint>> {
    self.endpoints.get(path).cloned()
  }

  /// The client address named by a trusted `X-Forwarded-For` header.
  pub(crate) fn forwarded_for(&self, header: Option<&str>) -> Option<String> {
    if !self.trust_forwarded {
      return None;
    }
    last_forwarded_entry(header?)
  }

  pub(crate) fn services(&self) -> &Arc<Services> {
    &self.services
  }
}

/// The entry appended by the closest proxy.
fn last_forwarded_entry(header: &str) -> Option<String> {
  header
    .rsplit(',')
    .next()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

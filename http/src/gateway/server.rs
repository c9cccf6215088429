use anyhow::Context;
use shared::config::SluiceConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::connection;
use super::Router;
use crate::context::{Endpoint, Services};

/// Accepts WebSocket connections for every configured endpoint.
pub struct GatewayServer {
  listener: TcpListener,
  router: Arc<Router>,
}

impl GatewayServer {
  pub async fn bind(
    listen_addr: &str,
    endpoints: Vec<Arc<Endpoint>>,
    services: Arc<Services>,
    trust_forwarded: bool,
  ) -> anyhow::Result<Self> {
    let listener = TcpListener::bind(listen_addr)
      .await
      .with_context(|| format!("binding {listen_addr}"))?;
    for endpoint in &endpoints {
      info!(path = %endpoint.path, "endpoint registered");
    }
    Ok(Self {
      listener,
      router: Arc::new(Router::new(endpoints, services, trust_forwarded)),
    })
  }

  pub async fn from_config(cfg: &SluiceConfig, services: Arc<Services>) -> anyhow::Result<Self> {
    Self::bind(
      &cfg.server.listen_addr,
      Endpoint::all_from_config(cfg),
      services,
      cfg.server.trust_x_forwarded_for,
    )
    .await
  }

  pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
    self.listener.local_addr()
  }

  /// Accept connections until `shutdown` resolves.
  ///
  /// Connections already open keep running; only accepting stops.
  pub async fn serve(self, shutdown: impl Future<Output = ()>) {
    let Self { listener, router } = self;
    if let Ok(addr) = listener.local_addr() {
      info!(addr = %addr, "gateway listening");
    }

    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);
    loop {
      tokio::select! {
        _ = &mut shutdown => break,
        accepted = listener.accept() => match accepted {
          Ok((stream, peer)) => {
            connections.spawn(connection::serve(stream, peer, router.clone()));
          }
          Err(e) => warn!(error = %e, "accept failed"),
        },
        Some(_) = connections.join_next(), if !connections.is_empty() => {}
      }
    }

    info!(open = connections.len(), "gateway stopped accepting");
    connections.detach_all();
  }
}

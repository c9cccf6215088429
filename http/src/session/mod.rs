//! Per-connection state.
//!
//! A [`Session`] lives as long as its WebSocket. It owns the identity that
//! is restored on the database before every statement and is the only way
//! frames reach the client: once the session is dead, sends are dropped.

pub mod claims;

use dashmap::DashMap;
use serde_json::{json, Map, Value};
use shared::protocol::ServerFrame;
use sluice_core::backend::Subscriber;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::auth::ClaimSet;
use crate::context::Endpoint;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// What the connection writer should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
  Frame(String),
  Close { code: u16, reason: &'static str },
}

struct ClaimEntry {
  claims: ClaimSet,
  generation: u64,
  timer: AbortHandle,
}

pub struct Session {
  id: u64,
  endpoint: Arc<Endpoint>,
  remote_address: String,
  start_timestamp: String,
  claims: DashMap<String, ClaimEntry>,
  claim_generation: AtomicU64,
  dead: AtomicBool,
  outbox: mpsc::UnboundedSender<Outgoing>,
}

impl Session {
  pub fn new(
    endpoint: Arc<Endpoint>,
    remote_address: impl Into<String>,
    outbox: mpsc::UnboundedSender<Outgoing>,
  ) -> Arc<Self> {
    Arc::new(Self {
      id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
      endpoint,
      remote_address: remote_address.into(),
      start_timestamp: chrono::Local::now().to_rfc3339(),
      claims: DashMap::new(),
      claim_generation: AtomicU64::new(0),
      dead: AtomicBool::new(false),
      outbox,
    })
  }

  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn endpoint(&self) -> &Endpoint {
    &self.endpoint
  }

  pub fn is_dead(&self) -> bool {
    self.dead.load(Ordering::Acquire)
  }

  /// Queue a frame for the client. Returns `false` if the session is dead.
  pub fn send(&self, frame: ServerFrame) -> bool {
    if self.is_dead() {
      return false;
    }
    self.outbox.send(Outgoing::Frame(frame.encode())).is_ok()
  }

  /// Ask the writer to close the socket.
  pub fn close(&self, code: u16, reason: &'static str) {
    let _ = self.outbox.send(Outgoing::Close { code, reason });
  }

  /// Stop all further sends and cancel claim timers.
  pub fn mark_dead(&self) {
    if self.dead.swap(true, Ordering::AcqRel) {
      return;
    }
    for entry in self.claims.iter() {
      entry.timer.abort();
    }
    debug!(session = self.id, "session marked dead");
  }

  /// The state handed to the restore-session call.
  pub fn snapshot(&self) -> Value {
    let claims: Map<String, Value> = self
      .claims
      .iter()
      .map(|entry| {
        let value = serde_json::to_value(&entry.claims).unwrap_or(Value::Null);
        (entry.key().clone(), value)
      })
      .collect();

    json!({
      "remote-address": self.remote_address,
      "session-start-timestamp": self.start_timestamp,
      "claims": claims,
    })
  }

  /// Issuers with claims currently applied.
  pub fn issuers(&self) -> Vec<String> {
    self.claims.iter().map(|e| e.key().clone()).collect()
  }
}

impl Subscriber for Session {
  fn subscriber_id(&self) -> u64 {
    self.id
  }

  fn notify(&self, channel: &str, payload: &str) -> bool {
    self.send(ServerFrame::Notification {
      channel: channel.to_string(),
      payload: payload.to_string(),
    })
  }
}

//! Seams between the protocol engine and the database.
//!
//! The http crate drives these traits; `sluice_pgsql` implements them
//! against PostgreSQL and tests implement them with in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;
use shared::error::Result;
use shared::protocol::JsonLiteral;
use std::sync::Arc;
use tokio::sync::watch;

use crate::format::ResultFormat;
use crate::operation::CompiledStatement;

/// Everything needed to run one compiled statement.
#[derive(Debug, Clone)]
pub struct Execution {
  pub statement: CompiledStatement,
  pub format: ResultFormat,
  /// Serialized session state handed to the restore-session call.
  pub session: Value,
  pub note: Option<String>,
}

/// Runs statements on pooled connections.
#[async_trait]
pub trait Executor: Send + Sync {
  /// Restore the session on a pooled connection, then run the statement.
  ///
  /// Returns `None` when the statement does not fetch its rows.
  async fn execute(&self, execution: Execution) -> Result<Option<JsonLiteral>>;

  /// Call the canonical-representation helper.
  async fn canonical_representations(&self, types: &[String], value: &str) -> Result<JsonLiteral>;
}

/// Something that receives notifications.
pub trait Subscriber: Send + Sync {
  /// Process-unique id.
  fn subscriber_id(&self) -> u64;

  /// Deliver one notification. Returns `false` once the subscriber is gone
  /// for good, after which it is dropped from every channel.
  fn notify(&self, channel: &str, payload: &str) -> bool;
}

/// Process-wide LISTEN fan-out.
#[async_trait]
pub trait NotificationRelay: Send + Sync {
  async fn listen(&self, subscriber: Arc<dyn Subscriber>, channel: &str) -> Result<()>;

  async fn unlisten(&self, subscriber_id: u64, channel: &str) -> Result<()>;

  async fn unlisten_all(&self, subscriber_id: u64) -> Result<()>;

  /// `true` while the database is reachable.
  fn readiness(&self) -> watch::Receiver<bool>;
}

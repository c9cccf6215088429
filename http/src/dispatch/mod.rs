//! Envelope decoding and per-request task supervision.
//!
//! Frames are decoded one at a time by the connection task. Each valid
//! envelope becomes its own task on the dispatcher's [`JoinSet`], so a slow
//! statement never holds up replies to later requests. Every task sends
//! exactly one `succeeded` or `failed` frame, including when the handler
//! panics.

pub mod extract;
mod handlers;

use futures_util::FutureExt;
use shared::error::SluiceError;
use shared::protocol::{Envelope, OperationKind, ServerFrame};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::context::Services;
use crate::session::Session;

const INTERNAL_ERROR_REASON: &str = "Internal server error";

/// What a handler task can reach.
pub(crate) struct HandlerContext {
  pub services: Arc<Services>,
  pub session: Arc<Session>,
}

pub struct Dispatcher {
  ctx: Arc<HandlerContext>,
  inflight: JoinSet<()>,
}

impl Dispatcher {
  pub fn new(services: Arc<Services>, session: Arc<Session>) -> Self {
    Self {
      ctx: Arc::new(HandlerContext { services, session }),
      inflight: JoinSet::new(),
    }
  }

  /// Decode one text frame and schedule its operation.
  ///
  /// Only a malformed envelope is an error; it means the connection must
  /// be closed. Everything else is answered by the spawned task.
  pub fn handle(&mut self, raw: &str) -> Result<(), SluiceError> {
    let envelope = Envelope::decode(raw)?;

    // Reap finished tasks so the set does not grow with the connection.
    while let Some(joined) = self.inflight.try_join_next() {
      if let Err(e) = joined {
        warn!(error = %e, "operation task ended abnormally");
      }
    }

    let span = info_span!("op", op = %envelope.kind, id = %envelope.id);
    let ctx = self.ctx.clone();
    self.inflight.spawn(respond(ctx, envelope).instrument(span));
    Ok(())
  }

  /// Operations still running.
  pub fn inflight(&self) -> usize {
    self.inflight.len()
  }

  /// Wait for every in-flight operation to finish.
  ///
  /// Their replies are dropped if the session is already dead.
  pub async fn drain(&mut self) {
    while let Some(joined) = self.inflight.join_next().await {
      if let Err(e) = joined {
        warn!(error = %e, "operation task ended abnormally");
      }
    }
  }
}

async fn respond(ctx: Arc<HandlerContext>, envelope: Envelope) {
  let Envelope { kind, id, fields } = envelope;
  let started = Instant::now();

  let outcome = match OperationKind::from_type(&kind) {
    Some(op) => AssertUnwindSafe(handlers::handle(&ctx, op, &fields))
      .catch_unwind()
      .await
      .unwrap_or_else(|panic| {
        Err(SluiceError::Internal(anyhow::anyhow!(
          "handler panicked: {}",
          panic_message(panic.as_ref())
        )))
      }),
    None => Err(SluiceError::client(format!(
      "Message type {kind:?} is not defined"
    ))),
  };

  debug!(
    elapsed = %format!("{:.6}", started.elapsed().as_secs_f64()),
    "handler finished"
  );

  let frame = match outcome {
    Ok(result) => ServerFrame::Succeeded { id, result },
    Err(err) => failure_frame(id, err, ctx.services.verbose),
  };
  ctx.session.send(frame);
}

fn failure_frame(id: String, err: SluiceError, verbose: bool) -> ServerFrame {
  match err.reply() {
    Some((reason, detail)) => {
      if verbose {
        warn!(error = ?err, "error whilst handling message");
      } else {
        warn!(error = %err, "error whilst handling message");
      }
      ServerFrame::Failed { id, reason, detail }
    }
    None => {
      error!(error = ?err, "exception whilst handling message");
      ServerFrame::Failed {
        id,
        reason: INTERNAL_ERROR_REASON.to_string(),
        detail: None,
      }
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
  if let Some(s) = panic.downcast_ref::<&'static str>() {
    s
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s
  } else {
    "non-string panic payload"
  }
}

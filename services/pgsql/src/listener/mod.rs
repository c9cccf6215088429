//! The shared LISTEN connection.
//!
//! One dedicated connection carries every `LISTEN` for the process. The
//! channel arena decides when a channel needs `LISTEN`/`UNLISTEN`; this
//! module owns the connection, re-establishes it after failures and
//! publishes whether it is currently up.

pub mod arena;

pub use arena::ChannelArena;

use async_trait::async_trait;
use futures_util::StreamExt;
use shared::error::Result;
use sluice_core::backend::{NotificationRelay, Subscriber};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_postgres::tls::NoTlsStream;
use tokio_postgres::{AsyncMessage, Connection, Socket};
use tracing::{debug, info, warn};

use crate::connector::{ConnectorConfig, PgClient};
use crate::error::backend_error;

struct ListenerState {
  client: Option<PgClient>,
  arena: ChannelArena,
}

struct Notification {
  channel: String,
  payload: String,
}

pub struct DatabaseListener {
  config: ConnectorConfig,
  state: Mutex<ListenerState>,
  ready: watch::Sender<bool>,
}

impl DatabaseListener {
  pub fn new(config: ConnectorConfig) -> Arc<Self> {
    let (ready, _) = watch::channel(false);
    Arc::new(Self {
      config,
      state: Mutex::new(ListenerState {
        client: None,
        arena: ChannelArena::new(),
      }),
      ready,
    })
  }

  /// Keep the listener connection up until the task is aborted.
  pub async fn run(self: Arc<Self>) {
    loop {
      match PgClient::connect(&self.config).await {
        Ok((client, connection)) => self.serve(client, connection).await,
        Err(e) => warn!(error = %e, "listener connection failed"),
      }
      tokio::time::sleep(self.config.reconnect_interval).await;
    }
  }

  async fn serve(&self, client: PgClient, connection: Connection<Socket, NoTlsStream>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(drive(connection, tx));

    {
      let mut state = self.state.lock().await;
      for channel in state.arena.channels() {
        if let Err(e) = client.listen(channel).await {
          warn!(channel, error = %e, "re-LISTEN failed");
        }
      }
      state.client = Some(client);
    }
    self.set_ready(true);

    while let Some(note) = rx.recv().await {
      self.dispatch(note).await;
    }

    self.state.lock().await.client = None;
    self.set_ready(false);
    if let Err(e) = driver.await {
      warn!(error = %e, "listener driver task failed");
    }
  }

  async fn dispatch(&self, note: Notification) {
    let mut state = self.state.lock().await;
    let (delivered, emptied) = state.arena.deliver(&note.channel, &note.payload);
    debug!(channel = %note.channel, delivered, "notification delivered");
    if emptied {
      unlisten_quietly(&state, &note.channel).await;
    }
  }

  fn set_ready(&self, ready: bool) {
    let changed = self.ready.send_if_modified(|current| {
      if *current == ready {
        false
      } else {
        *current = ready;
        true
      }
    });
    if changed {
      info!(ready, "database readiness changed");
    }
  }
}

async fn unlisten_quietly(state: &ListenerState, channel: &str) {
  if let Some(client) = &state.client {
    match client.unlisten(channel).await {
      Ok(()) => info!(channel, "UNLISTEN"),
      Err(e) => warn!(channel, error = %e, "UNLISTEN failed"),
    }
  }
}

/// Poll the connection, forwarding notifications until it closes.
async fn drive(
  mut connection: Connection<Socket, NoTlsStream>,
  tx: mpsc::UnboundedSender<Notification>,
) {
  let mut messages =
    std::pin::pin!(futures_util::stream::poll_fn(move |cx| connection.poll_message(cx)));
  while let Some(message) = messages.next().await {
    match message {
      Ok(AsyncMessage::Notification(n)) => {
        let note = Notification {
          channel: n.channel().to_string(),
          payload: n.payload().to_string(),
        };
        if tx.send(note).is_err() {
          break;
        }
      }
      Ok(AsyncMessage::Notice(notice)) => {
        debug!(message = notice.message(), "listener notice");
      }
      Ok(_) => {}
      Err(e) => {
        warn!(error = %e, "listener connection lost");
        break;
      }
    }
  }
}

#[async_trait]
impl NotificationRelay for DatabaseListener {
  async fn listen(&self, subscriber: Arc<dyn Subscriber>, channel: &str) -> Result<()> {
    let mut guard = self.state.lock().await;
    let state = &mut *guard;
    if !state.arena.subscribe(channel, &subscriber) {
      return Ok(());
    }
    // While disconnected the channel is LISTENed on reconnect.
    if let Some(client) = &state.client {
      if let Err(e) = client.listen(channel).await {
        state.arena.unsubscribe(channel, subscriber.subscriber_id());
        return Err(backend_error(e));
      }
      info!(channel, "LISTEN");
    }
    Ok(())
  }

  async fn unlisten(&self, subscriber_id: u64, channel: &str) -> Result<()> {
    let mut state = self.state.lock().await;
    if state.arena.unsubscribe(channel, subscriber_id) {
      unlisten_quietly(&state, channel).await;
    }
    Ok(())
  }

  async fn unlisten_all(&self, subscriber_id: u64) -> Result<()> {
    let mut state = self.state.lock().await;
    for channel in state.arena.remove_subscriber(subscriber_id) {
      unlisten_quietly(&state, &channel).await;
    }
    Ok(())
  }

  fn readiness(&self) -> watch::Receiver<bool> {
    self.ready.subscribe()
  }
}

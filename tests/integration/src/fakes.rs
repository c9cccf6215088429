use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use shared::error::{Result, SluiceError};
use shared::protocol::JsonLiteral;
use sluice_core::backend::{Execution, Executor, NotificationRelay, Subscriber};
use sluice_http::auth::{ClaimSet, ClaimsDecoder, IssuerRegistry};
use sluice_http::{Endpoint, GatewayServer, Services};
use sluice_pgsql::listener::ChannelArena;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Replies with each statement's rendered SQL and remembers what it ran.
#[derive(Default)]
pub struct EchoExecutor {
  pub seen: Mutex<Vec<Execution>>,
}

#[async_trait]
impl Executor for EchoExecutor {
  async fn execute(&self, execution: Execution) -> Result<Option<JsonLiteral>> {
    let sql = execution.statement.sql.render();
    let fetch = execution.statement.fetch_result;
    self.seen.lock().unwrap().push(execution);
    if !fetch {
      return Ok(None);
    }
    Ok(Some(JsonLiteral::encode(&sql).unwrap()))
  }

  async fn canonical_representations(&self, types: &[String], value: &str) -> Result<JsonLiteral> {
    let all: Vec<Value> = types.iter().map(|_| json!(value)).collect();
    Ok(JsonLiteral::encode(&all).unwrap())
  }
}

/// In-process fan-out over the same arena the database listener uses.
pub struct MemoryRelay {
  arena: tokio::sync::Mutex<ChannelArena>,
  ready: watch::Sender<bool>,
}

impl MemoryRelay {
  pub fn new(ready: bool) -> Arc<Self> {
    Arc::new(Self {
      arena: tokio::sync::Mutex::new(ChannelArena::new()),
      ready: watch::channel(ready).0,
    })
  }

  pub async fn publish(&self, channel: &str, payload: &str) -> usize {
    self.arena.lock().await.deliver(channel, payload).0
  }

  pub async fn subscriber_count(&self, channel: &str) -> usize {
    self.arena.lock().await.subscriber_count(channel)
  }

  pub fn set_ready(&self, ready: bool) {
    self.ready.send_replace(ready);
  }
}

#[async_trait]
impl NotificationRelay for MemoryRelay {
  async fn listen(&self, subscriber: Arc<dyn Subscriber>, channel: &str) -> Result<()> {
    self.arena.lock().await.subscribe(channel, &subscriber);
    Ok(())
  }

  async fn unlisten(&self, subscriber_id: u64, channel: &str) -> Result<()> {
    self.arena.lock().await.unsubscribe(channel, subscriber_id);
    Ok(())
  }

  async fn unlisten_all(&self, subscriber_id: u64) -> Result<()> {
    self.arena.lock().await.remove_subscriber(subscriber_id);
    Ok(())
  }

  fn readiness(&self) -> watch::Receiver<bool> {
    self.ready.subscribe()
  }
}

/// Tokens are whole seconds from now.
pub struct RelativeExpiry;

impl ClaimsDecoder for RelativeExpiry {
  fn decode(&self, token: &str) -> Result<ClaimSet> {
    let secs: i64 = token
      .parse()
      .map_err(|_| SluiceError::client("Invalid JWT: not a number"))?;
    let now = std::time::SystemTime::now()
      .duration_since(std::time::UNIX_EPOCH)
      .unwrap()
      .as_secs() as i64;
    Ok(ClaimSet::new(now + secs).with_claim("sub", json!("user-1")))
  }
}

pub struct Gateway {
  pub addr: SocketAddr,
  pub executor: Arc<EchoExecutor>,
  pub relay: Arc<MemoryRelay>,
  stop: Option<oneshot::Sender<()>>,
}

impl Gateway {
  pub async fn start(trust_forwarded: bool) -> Self {
    let executor = Arc::new(EchoExecutor::default());
    let relay = MemoryRelay::new(true);
    let mut issuers = IssuerRegistry::new();
    issuers.insert("corp", Arc::new(RelativeExpiry));

    let services = Arc::new(Services {
      executor: executor.clone(),
      relay: relay.clone(),
      issuers,
      verbose: true,
    });
    let endpoints = vec![Arc::new(Endpoint::new("/app", ["app"]))];
    let server = GatewayServer::bind("127.0.0.1:0", endpoints, services, trust_forwarded)
      .await
      .unwrap();
    let addr = server.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel();
    tokio::spawn(server.serve(async {
      let _ = stopped.await;
    }));

    Self {
      addr,
      executor,
      relay,
      stop: Some(stop),
    }
  }

  pub fn url(&self, path: &str) -> String {
    format!("ws://{}{}", self.addr, path)
  }

  /// Connect and consume the initial readiness frame.
  pub async fn connect(&self) -> Client {
    let (mut client, _) = tokio_tungstenite::connect_async(self.url("/app"))
      .await
      .unwrap();
    let ready = next_json(&mut client).await;
    assert_eq!(ready["type"], "database-readiness");
    client
  }
}

impl Drop for Gateway {
  fn drop(&mut self) {
    if let Some(stop) = self.stop.take() {
      let _ = stop.send(());
    }
  }
}

pub async fn send(client: &mut Client, value: Value) {
  client.send(Message::Text(value.to_string())).await.unwrap();
}

/// The next text frame, decoded.
pub async fn next_json(client: &mut Client) -> Value {
  loop {
    match client.next().await {
      Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
      Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
      other => panic!("expected a text frame, got {other:?}"),
    }
  }
}

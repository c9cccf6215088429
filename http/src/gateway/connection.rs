use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use shared::protocol::{ServerFrame, PROTOCOL_ERROR_CLOSE_CODE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, info_span, warn, Instrument};

use super::Router;
use crate::context::Endpoint;
use crate::dispatch::Dispatcher;
use crate::session::{Outgoing, Session};

type Socket = WebSocketStream<TcpStream>;

const UNPARSABLE_MESSAGE: &str = "Unparsable message";

/// Handshake, then run the session until the socket closes.
pub(crate) async fn serve(stream: TcpStream, peer: SocketAddr, router: Arc<Router>) {
  let mut endpoint = None;
  let mut forwarded = None;

  let handshake = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
    let header = req
      .headers()
      .get("x-forwarded-for")
      .and_then(|v| v.to_str().ok());
    forwarded = router.forwarded_for(header);

    match router.route(req.uri().path()) {
      Some(found) => {
        endpoint = Some(found);
        Ok(resp)
      }
      None => {
        let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
        *rejection.status_mut() = StatusCode::NOT_FOUND;
        Err(rejection)
      }
    }
  })
  .await;

  let socket = match handshake {
    Ok(socket) => socket,
    Err(e) => {
      debug!(peer = %peer, error = %e, "handshake rejected");
      return;
    }
  };
  let Some(endpoint) = endpoint else {
    return;
  };

  let remote = forwarded.unwrap_or_else(|| peer.ip().to_string());
  let span = info_span!("session", path = %endpoint.path, remote = %remote);
  run(socket, endpoint, remote, router).instrument(span).await;
}

async fn run(socket: Socket, endpoint: Arc<Endpoint>, remote: String, router: Arc<Router>) {
  let services = router.services().clone();
  let (sink, mut source) = socket.split();
  let (outbox, queued) = mpsc::unbounded_channel();
  let writer = tokio::spawn(write_frames(sink, queued));

  let session = Session::new(endpoint, remote, outbox);
  let session_id = session.id();
  info!(session = session_id, "connection opened");

  let readiness = forward_readiness(&session, services.relay.readiness());
  let mut dispatcher = Dispatcher::new(services.clone(), session.clone());

  while let Some(message) = source.next().await {
    let text = match message {
      Ok(Message::Text(text)) => text,
      Ok(Message::Binary(data)) => match String::from_utf8(data) {
        Ok(text) => text,
        Err(_) => {
          warn!(session = session_id, "binary frame is not UTF-8");
          session.close(PROTOCOL_ERROR_CLOSE_CODE, UNPARSABLE_MESSAGE);
          break;
        }
      },
      Ok(Message::Close(_)) => break,
      Ok(_) => continue,
      Err(e) => {
        debug!(session = session_id, error = %e, "read failed");
        break;
      }
    };

    if let Err(e) = dispatcher.handle(&text) {
      warn!(session = session_id, error = %e, "closing connection");
      session.close(PROTOCOL_ERROR_CLOSE_CODE, UNPARSABLE_MESSAGE);
      break;
    }
  }

  session.mark_dead();
  readiness.abort();
  if let Err(e) = services.relay.unlisten_all(session_id).await {
    warn!(session = session_id, error = %e, "unlisten on close failed");
  }
  dispatcher.drain().await;

  // Dropping the last sender lets the writer flush and stop.
  drop(dispatcher);
  drop(session);
  if let Err(e) = writer.await {
    warn!(session = session_id, error = %e, "writer task failed");
  }
  info!(session = session_id, "connection closed");
}

/// Send the current readiness, then every change, while the session lives.
fn forward_readiness(
  session: &Arc<Session>,
  mut readiness: tokio::sync::watch::Receiver<bool>,
) -> JoinHandle<()> {
  let ready = *readiness.borrow_and_update();
  session.send(ServerFrame::DatabaseReadiness { ready });

  let session = Arc::downgrade(session);
  tokio::spawn(async move {
    while readiness.changed().await.is_ok() {
      let ready = *readiness.borrow_and_update();
      let Some(session) = session.upgrade() else {
        break;
      };
      if !session.send(ServerFrame::DatabaseReadiness { ready }) {
        break;
      }
    }
  })
}

async fn write_frames(
  mut sink: SplitSink<Socket, Message>,
  mut queued: mpsc::UnboundedReceiver<Outgoing>,
) {
  while let Some(outgoing) = queued.recv().await {
    match outgoing {
      Outgoing::Frame(text) => {
        if let Err(e) = sink.send(Message::Text(text)).await {
          debug!(error = %e, "write failed");
          return;
        }
      }
      Outgoing::Close { code, reason } => {
        let frame = CloseFrame {
          code: CloseCode::from(code),
          reason: reason.into(),
        };
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
          debug!(error = %e, "close failed");
        }
        return;
      }
    }
  }
  let _ = sink.close().await;
}

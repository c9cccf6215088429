use futures_util::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::fakes::{next_json, send, Gateway};

#[tokio::test]
async fn select_round_trip() {
  let gateway = Gateway::start(false).await;
  let mut client = gateway.connect().await;

  send(
    &mut client,
    json!({
      "type": "select",
      "id": "q1",
      "schema": "app",
      "relation": "items",
      "order": [{ "column": "id" }],
      "slice": { "relative-to": { "id": 5 } },
      "limit": 10,
    }),
  )
  .await;

  let reply = next_json(&mut client).await;
  assert_eq!(reply["type"], "succeeded");
  assert_eq!(reply["id"], "q1");
  assert_eq!(
    reply["result"],
    "SELECT * FROM \"app\".\"items\" WHERE (\"id\" > 5 OR (\"id\" = 5 AND FALSE)) ORDER BY \"id\" ASC NULLS FIRST LIMIT 10"
  );
}

#[tokio::test]
async fn initial_frame_reports_readiness() {
  let gateway = Gateway::start(false).await;
  gateway.relay.set_ready(false);
  let (mut client, _) = tokio_tungstenite::connect_async(gateway.url("/app"))
    .await
    .unwrap();
  assert_eq!(
    next_json(&mut client).await,
    json!({ "type": "database-readiness", "ready": false })
  );

  gateway.relay.set_ready(true);
  assert_eq!(
    next_json(&mut client).await,
    json!({ "type": "database-readiness", "ready": true })
  );
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
  let gateway = Gateway::start(false).await;
  match tokio_tungstenite::connect_async(gateway.url("/elsewhere")).await {
    Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 404),
    other => panic!("expected 404, got {:?}", other.map(|_| ())),
  }
}

#[tokio::test]
async fn unknown_type_keeps_the_connection() {
  let gateway = Gateway::start(false).await;
  let mut client = gateway.connect().await;

  send(&mut client, json!({ "type": "frobnicate", "id": "1" })).await;
  let reply = next_json(&mut client).await;
  assert_eq!(reply["type"], "failed");
  assert_eq!(reply["reason"], "Message type \"frobnicate\" is not defined");

  send(&mut client, json!({ "type": "unlisten-all", "id": "2" })).await;
  let reply = next_json(&mut client).await;
  assert_eq!(reply, json!({ "type": "succeeded", "id": "2", "result": null }));
}

#[tokio::test]
async fn malformed_envelope_closes_with_4002() {
  let gateway = Gateway::start(false).await;
  let mut client = gateway.connect().await;

  send(&mut client, json!({ "type": "select", "id": 17 })).await;
  match client.next().await {
    Some(Ok(Message::Close(Some(frame)))) => {
      assert_eq!(u16::from(frame.code), 4002);
      assert_eq!(frame.reason, "Unparsable message");
    }
    other => panic!("expected close frame, got {other:?}"),
  }
}

#[tokio::test]
async fn notifications_reach_listeners_until_disconnect() {
  let gateway = Gateway::start(false).await;
  let mut client = gateway.connect().await;

  send(&mut client, json!({ "type": "listen", "id": "l", "channel": "orders" })).await;
  assert_eq!(next_json(&mut client).await["type"], "succeeded");

  assert_eq!(gateway.relay.publish("orders", "{\"id\":3}").await, 1);
  assert_eq!(
    next_json(&mut client).await,
    json!({ "type": "notification", "channel": "orders", "payload": "{\"id\":3}" })
  );

  drop(client);
  for _ in 0..50 {
    if gateway.relay.subscriber_count("orders").await == 0 {
      return;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  panic!("subscription outlived its connection");
}

#[tokio::test]
async fn forwarded_address_is_trusted_when_configured() {
  let gateway = Gateway::start(true).await;
  let mut request = gateway.url("/app").into_client_request().unwrap();
  request.headers_mut().insert(
    "x-forwarded-for",
    HeaderValue::from_static("203.0.113.9, 198.51.100.4"),
  );
  let (mut client, _) = tokio_tungstenite::connect_async(request).await.unwrap();
  next_json(&mut client).await;

  send(
    &mut client,
    json!({ "type": "delete", "id": "d", "schema": "app", "relation": "items", "returning-columns": [] }),
  )
  .await;
  let reply = next_json(&mut client).await;
  assert_eq!(reply["result"], Value::Null);

  let seen = gateway.executor.seen.lock().unwrap();
  assert_eq!(seen[0].session["remote-address"], "198.51.100.4");
  assert_eq!(seen[0].statement.sql.render(), "DELETE FROM \"app\".\"items\"");
}

#[tokio::test]
async fn applied_claims_travel_with_later_statements() {
  let gateway = Gateway::start(false).await;
  let mut client = gateway.connect().await;

  send(
    &mut client,
    json!({ "type": "apply-jwt", "id": "j", "issuer": "corp", "token": "3600" }),
  )
  .await;
  let reply = next_json(&mut client).await;
  let expires_in = reply["result"].as_i64().unwrap();
  assert!((3598..=3600).contains(&expires_in), "{expires_in}");

  send(
    &mut client,
    json!({ "type": "insert", "id": "i", "schema": "app", "relation": "items",
            "rows": [{ "a": 1 }, { "b": 2 }], "chronicle-note": "bulk" }),
  )
  .await;
  assert_eq!(next_json(&mut client).await["type"], "succeeded");

  let seen = gateway.executor.seen.lock().unwrap();
  let execution = &seen[0];
  assert_eq!(execution.session["claims"]["corp"]["sub"], "user-1");
  assert_eq!(execution.note.as_deref(), Some("bulk"));
  assert_eq!(
    execution.statement.sql.render(),
    "INSERT INTO \"app\".\"items\" (\"a\", \"b\") VALUES (1, DEFAULT), (DEFAULT, 2) RETURNING *"
  );
}

use sluice_core::backend::{NotificationRelay, Subscriber};
use sluice_pgsql::DatabaseListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::schema::{connect, load_test_config};

struct Forward {
  id: u64,
  tx: mpsc::UnboundedSender<(String, String)>,
}

impl Subscriber for Forward {
  fn subscriber_id(&self) -> u64 {
    self.id
  }

  fn notify(&self, channel: &str, payload: &str) -> bool {
    self.tx.send((channel.to_string(), payload.to_string())).is_ok()
  }
}

async fn wait_ready(listener: &DatabaseListener) {
  let mut ready = listener.readiness();
  tokio::time::timeout(Duration::from_secs(10), ready.wait_for(|r| *r))
    .await
    .expect("listener never became ready")
    .unwrap();
}

#[tokio::test]
#[ignore]
async fn notifications_fan_out_to_subscribers() {
  let cfg = load_test_config();
  let listener = DatabaseListener::new(cfg.clone());
  let task = tokio::spawn(listener.clone().run());
  wait_ready(&listener).await;

  let (tx, mut rx) = mpsc::unbounded_channel();
  let subscriber: Arc<dyn Subscriber> = Arc::new(Forward { id: 1, tx });
  listener.listen(subscriber.clone(), "sluice_it_orders").await.unwrap();

  let client = connect(&cfg).await;
  client
    .batch_execute("NOTIFY sluice_it_orders, 'order 7'")
    .await
    .unwrap();

  let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
    .await
    .expect("notification not delivered")
    .unwrap();
  assert_eq!(received, ("sluice_it_orders".to_string(), "order 7".to_string()));

  listener.unlisten_all(1).await.unwrap();
  client
    .batch_execute("NOTIFY sluice_it_orders, 'order 8'")
    .await
    .unwrap();
  assert!(tokio::time::timeout(Duration::from_millis(300), rx.recv())
    .await
    .is_err());

  task.abort();
}

use sluice_pgsql::connector::ConnectorConfig;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_postgres::{Client, NoTls};

pub const APP_SCHEMA: &str = "sluice_it";
pub const PRIVATE_SCHEMA: &str = "sluice_it_private";

/// Connection settings for the test database.
pub fn load_test_config() -> ConnectorConfig {
  dotenvy::dotenv().ok();
  let connection_string = std::env::var("SLUICE_TEST_DATABASE_URL")
    .expect("SLUICE_TEST_DATABASE_URL must be set");

  ConnectorConfig {
    connection_string,
    application_name: "sluice_integration_test".to_string(),
    pool_size: 2,
    private_schema: PRIVATE_SCHEMA.to_string(),
    reconnect_interval: Duration::from_millis(200),
  }
}

pub async fn connect(cfg: &ConnectorConfig) -> Client {
  let (client, connection) = tokio_postgres::connect(&cfg.connection_string, NoTls)
    .await
    .expect("connect to test database");
  tokio::spawn(async move {
    if let Err(e) = connection.await {
      eprintln!("connection error: {}", e);
    }
  });
  client
}

static FIXTURES: OnceCell<()> = OnceCell::const_new();

/// Recreate the test schemas once per test run. Tests only read them.
pub async fn ensure_fixtures(cfg: &ConnectorConfig) {
  FIXTURES
    .get_or_init(|| async {
      apply_fixtures(&connect(cfg).await).await;
    })
    .await;
}

/// Drop and create the test schemas.
///
/// `restore_session` stores the session in a transaction-independent
/// setting so the statement that follows can read it back.
pub async fn apply_fixtures(client: &Client) {
  let ddl = format!(
    r#"
    DROP SCHEMA IF EXISTS {app} CASCADE;
    DROP SCHEMA IF EXISTS {private} CASCADE;
    CREATE SCHEMA {app};
    CREATE SCHEMA {private};

    CREATE TABLE {app}.items (
      id integer PRIMARY KEY,
      name text NOT NULL UNIQUE,
      rank integer
    );

    INSERT INTO {app}.items (id, name, rank) VALUES
      (1, 'alpha', 3),
      (2, 'bravo', NULL),
      (3, 'charlie', 1),
      (4, 'delta', 3),
      (5, 'echo', NULL),
      (6, 'foxtrot', 2),
      (7, 'golf', 1);

    CREATE FUNCTION {private}.restore_session(session jsonb, note text) RETURNS void
    LANGUAGE plpgsql AS $$
    BEGIN
      PERFORM set_config('sluice.session', session::text, false);
      PERFORM set_config('sluice.note', coalesce(note, ''), false);
    END;
    $$;

    CREATE FUNCTION {private}.get_canonical_representations(types regtype[], value text)
    RETURNS jsonb LANGUAGE sql AS $$
      SELECT jsonb_agg(value) FROM unnest(types);
    $$;

    CREATE FUNCTION {app}.whoami() RETURNS TABLE (remote text, note text)
    LANGUAGE sql AS $$
      SELECT current_setting('sluice.session')::jsonb ->> 'remote-address',
             current_setting('sluice.note');
    $$;
    "#,
    app = APP_SCHEMA,
    private = PRIVATE_SCHEMA,
  );
  client.batch_execute(&ddl).await.expect("apply fixtures");
}

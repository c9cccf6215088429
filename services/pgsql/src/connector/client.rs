use super::config::ConnectorConfig;
use sluice_core::sql::Sql;
use tokio_postgres::tls::NoTlsStream;
use tokio_postgres::{Client, Connection, NoTls, Socket};
use tracing::info;

/// A dedicated, unpooled connection.
///
/// Notifications arrive on the connection that issued `LISTEN`, so the
/// listener keeps one of these for the lifetime of each database session
/// instead of borrowing from the pool.
pub struct PgClient {
  client: Client,
}

impl PgClient {
  /// Connect to the PostgreSQL database.
  pub async fn connect(
    config: &ConnectorConfig,
  ) -> Result<(Self, Connection<Socket, NoTlsStream>), tokio_postgres::Error> {
    let mut pg = config.connection_string.parse::<tokio_postgres::Config>()?;
    pg.application_name(&config.application_name);
    let (client, connection) = pg.connect(NoTls).await?;

    info!(
        app_name = %config.application_name,
        "listener connected to PostgreSQL"
    );

    Ok((Self { client }, connection))
  }

  pub async fn listen(&self, channel: &str) -> Result<(), tokio_postgres::Error> {
    let sql = Sql::raw("LISTEN ").then(Sql::ident(channel));
    self.client.batch_execute(&sql.render()).await
  }

  pub async fn unlisten(&self, channel: &str) -> Result<(), tokio_postgres::Error> {
    let sql = Sql::raw("UNLISTEN ").then(Sql::ident(channel));
    self.client.batch_execute(&sql.render()).await
  }
}

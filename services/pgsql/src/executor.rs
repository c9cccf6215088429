use async_trait::async_trait;
use deadpool_postgres::Pool;
use shared::error::Result;
use shared::protocol::JsonLiteral;
use sluice_core::backend::{Execution, Executor};
use sluice_core::format::{format, wrap_json_aggregate, RawResult, ResultFormat, RowSet};
use sluice_core::operation::{canonical_representations_call, restore_session_call};
use tokio_postgres::{Client, SimpleQueryMessage};
use tracing::trace;

use crate::error::{backend_error, pool_error};

/// Runs compiled statements on pooled connections.
///
/// Each call checks out one connection, restores the session on it, runs
/// exactly one statement and returns the connection to the pool.
pub struct PgExecutor {
  pool: Pool,
  private_schema: String,
}

impl PgExecutor {
  pub fn new(pool: Pool, private_schema: impl Into<String>) -> Self {
    Self {
      pool,
      private_schema: private_schema.into(),
    }
  }

  /// Get the current pool size for observability.
  pub fn pool_size(&self) -> usize {
    self.pool.status().size
  }
}

#[async_trait]
impl Executor for PgExecutor {
  async fn execute(&self, execution: Execution) -> Result<Option<JsonLiteral>> {
    let conn = self.pool.get().await.map_err(pool_error)?;

    let restore = restore_session_call(
      &self.private_schema,
      &execution.session,
      execution.note.as_deref(),
    );
    conn
      .execute(restore.render().as_str(), &[])
      .await
      .map_err(backend_error)?;

    let statement = execution.statement;
    if !statement.fetch_result {
      let sql = statement.sql.render();
      trace!(%sql, "executing without fetch");
      conn.execute(sql.as_str(), &[]).await.map_err(backend_error)?;
      return Ok(None);
    }

    let raw = match execution.format {
      ResultFormat::Json => {
        let sql = wrap_json_aggregate(statement.sql).render();
        trace!(%sql, "executing");
        let row = conn
          .query_one(sql.as_str(), &[])
          .await
          .map_err(backend_error)?;
        let text: Option<String> = row.try_get(0).map_err(backend_error)?;
        RawResult::Aggregated(text)
      }
      ResultFormat::Csv => {
        let sql = statement.sql.render();
        trace!(%sql, "executing for csv");
        RawResult::Table(text_rows(&conn, &sql).await?)
      }
    };

    format(raw).map(Some)
  }

  async fn canonical_representations(&self, types: &[String], value: &str) -> Result<JsonLiteral> {
    let conn = self.pool.get().await.map_err(pool_error)?;
    let sql = canonical_representations_call(&self.private_schema, types, value).render();
    let row = conn
      .query_one(sql.as_str(), &[])
      .await
      .map_err(backend_error)?;
    let text: Option<String> = row.try_get(0).map_err(backend_error)?;
    Ok(JsonLiteral::from_trusted(
      text.unwrap_or_else(|| "null".to_string()),
    ))
  }
}

/// Run `sql` over the simple protocol, which reports every value in its
/// text representation.
async fn text_rows(client: &Client, sql: &str) -> Result<RowSet> {
  let messages = client.simple_query(sql).await.map_err(backend_error)?;

  let mut out = RowSet::default();
  for message in messages {
    match message {
      SimpleQueryMessage::RowDescription(columns) => {
        out.columns = columns.iter().map(|c| c.name().to_string()).collect();
      }
      SimpleQueryMessage::Row(row) => {
        if out.columns.is_empty() {
          out.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        out
          .rows
          .push((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
      }
      _ => {}
    }
  }
  Ok(out)
}

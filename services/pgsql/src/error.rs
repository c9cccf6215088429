//! Translation of driver and pool errors into [`SluiceError`].

use deadpool_postgres::PoolError;
use serde_json::{json, Map, Value};
use shared::error::SluiceError;
use tokio_postgres::error::{DbError, ErrorPosition};

use crate::sqlstate::sqlstate_name;

/// A statement or connection failure reported by the driver.
///
/// Database-side errors keep their structured fields; other driver
/// failures use the first line of their message.
pub fn backend_error(err: tokio_postgres::Error) -> SluiceError {
  match err.as_db_error() {
    Some(db) => SluiceError::Backend {
      message: reason(db.message(), db.detail()),
      diagnostics: diagnostics(db),
    },
    None => SluiceError::Backend {
      message: err.to_string().lines().next().unwrap_or_default().to_string(),
      diagnostics: json!({ "sqlstate": null, "sqlstate-name": null }),
    },
  }
}

/// A failed checkout. Only connect failures are the database's doing.
pub fn pool_error(err: PoolError) -> SluiceError {
  match err {
    PoolError::Backend(e) => backend_error(e),
    other => SluiceError::Internal(anyhow::anyhow!("connection pool: {}", other)),
  }
}

fn reason(primary: &str, detail: Option<&str>) -> String {
  match detail {
    Some(detail) if !detail.is_empty() => format!("{primary}: {detail}"),
    _ => primary.to_string(),
  }
}

fn diagnostics(db: &DbError) -> Value {
  let code = db.code().code();
  let position = db.position().map(|p| match p {
    ErrorPosition::Original(pos) => *pos,
    ErrorPosition::Internal { position, .. } => *position,
  });

  let mut out = Map::new();
  let mut put = |key: &str, value: Option<&str>| {
    out.insert(key.to_string(), value.map_or(Value::Null, |v| Value::from(v)));
  };
  put("severity", Some(db.severity()));
  put("sqlstate", Some(code));
  put("message-primary", Some(db.message()));
  put("message-detail", db.detail());
  put("message-hint", db.hint());
  put("context", db.where_());
  put("schema-name", db.schema());
  put("table-name", db.table());
  put("column-name", db.column());
  put("datatype-name", db.datatype());
  put("constraint-name", db.constraint());
  put("sqlstate-name", sqlstate_name(code));
  out.insert(
    "statement-position".to_string(),
    position.map_or(Value::Null, Value::from),
  );
  Value::Object(out)
}

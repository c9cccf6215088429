//! Shaping statement results for the reply.

use anyhow::Context;
use shared::error::{Result, SluiceError};
use shared::protocol::JsonLiteral;
use std::str::FromStr;

use crate::sql::Sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
  /// Rows aggregated by the database into one JSON array.
  #[default]
  Json,
  /// A header line plus one line per row, delivered as one JSON string.
  Csv,
}

impl FromStr for ResultFormat {
  type Err = SluiceError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "json" => Ok(Self::Json),
      "csv" => Ok(Self::Csv),
      _ => Err(SluiceError::client("result-format must be one of json, csv")),
    }
  }
}

/// Rows in their text representation. `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
  pub columns: Vec<String>,
  pub rows: Vec<Vec<Option<String>>>,
}

/// What the executor read back.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
  /// The single text value produced by [`wrap_json_aggregate`].
  Aggregated(Option<String>),
  Table(RowSet),
}

/// Wrap `statement` so the database returns its rows as one JSON array.
pub fn wrap_json_aggregate(statement: Sql) -> Sql {
  Sql::raw("WITH results AS (")
    .then(statement)
    .raw_then(
      ") SELECT COALESCE(jsonb_agg(to_jsonb(results)), '[]'::jsonb)::text AS result FROM results",
    )
}

/// Turn a raw result into the literal spliced into the reply.
pub fn format(raw: RawResult) -> Result<JsonLiteral> {
  match raw {
    RawResult::Aggregated(Some(text)) => Ok(JsonLiteral::from_trusted(text)),
    RawResult::Aggregated(None) => Ok(JsonLiteral::from_trusted("[]")),
    RawResult::Table(rows) => {
      let text = write_csv(&rows)?;
      Ok(JsonLiteral::encode(&text).context("encoding csv result")?)
    }
  }
}

fn write_csv(rows: &RowSet) -> Result<String> {
  let mut writer = csv::WriterBuilder::new()
    .terminator(csv::Terminator::CRLF)
    .from_writer(Vec::new());

  writer
    .write_record(&rows.columns)
    .context("writing csv header")?;
  for row in &rows.rows {
    writer
      .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
      .context("writing csv row")?;
  }

  let bytes = writer
    .into_inner()
    .map_err(|e| anyhow::anyhow!("flushing csv writer: {}", e.error()))?;
  Ok(String::from_utf8(bytes).context("csv output is not utf-8")?)
}

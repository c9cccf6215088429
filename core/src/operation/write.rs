use serde_json::{Map, Value};
use shared::error::{Result, SluiceError};
use std::collections::HashSet;

use super::{AllowedSchemas, CompiledStatement, RelationTarget, ReturningSpec};
use crate::rules::compile_rules;
use crate::sql::Sql;

// ── Insert ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct InsertRequest {
  pub target: RelationTarget,
  pub rows: Vec<Map<String, Value>>,
  pub returning: ReturningSpec,
}

/// One multi-row `INSERT`.
///
/// The column list is the union of every row's keys in first-seen order.
/// A row lacking a column gets `DEFAULT` in that cell.
pub fn compile_insert(req: &InsertRequest, schemas: &AllowedSchemas) -> Result<CompiledStatement> {
  schemas.check(&req.target)?;
  let target = req.target.writable()?;

  if req.rows.is_empty() {
    return Err(SluiceError::client("rows list must not be empty"));
  }

  let mut seen = HashSet::new();
  let mut columns: Vec<&str> = Vec::new();
  for row in &req.rows {
    if row.is_empty() {
      return Err(SluiceError::client("row dictionary must not be empty"));
    }
    for key in row.keys() {
      if seen.insert(key.as_str()) {
        columns.push(key);
      }
    }
  }

  let tuples = req.rows.iter().map(|row| {
    Sql::join(
      columns.iter().map(|column| match row.get(*column) {
        Some(value) => Sql::literal(value.clone()),
        None => Sql::raw("DEFAULT"),
      }),
      ", ",
    )
    .parenthesized()
  });

  let sql = Sql::raw("INSERT INTO ")
    .then(target)
    .raw_then(" ")
    .then(Sql::join(columns.iter().map(|c| Sql::ident(c)), ", ").parenthesized())
    .raw_then(" VALUES ")
    .then(Sql::join(tuples, ", "))
    .then(req.returning.returning_clause());

  Ok(CompiledStatement {
    sql,
    fetch_result: req.returning.fetches(),
  })
}

// ── Update ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
  pub target: RelationTarget,
  pub updates: Map<String, Value>,
  pub rules: Option<Value>,
  pub returning: ReturningSpec,
}

pub fn compile_update(req: &UpdateRequest, schemas: &AllowedSchemas) -> Result<CompiledStatement> {
  schemas.check(&req.target)?;
  let target = req.target.writable()?;

  if req.updates.is_empty() {
    return Err(SluiceError::client("updates must not be empty"));
  }

  let assignments = req.updates.iter().map(|(column, value)| {
    Sql::ident(column)
      .raw_then(" = ")
      .then(Sql::literal(value.clone()))
  });

  let mut sql = Sql::raw("UPDATE ")
    .then(target)
    .raw_then(" SET ")
    .then(Sql::join(assignments, ", "));
  if let Some(predicate) = compile_rules(req.rules.as_ref())? {
    sql = sql.raw_then(" WHERE ").then(predicate);
  }
  sql.push(req.returning.returning_clause());

  Ok(CompiledStatement {
    sql,
    fetch_result: req.returning.fetches(),
  })
}

// ── Delete ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
  pub target: RelationTarget,
  pub rules: Option<Value>,
  pub returning: ReturningSpec,
}

pub fn compile_delete(req: &DeleteRequest, schemas: &AllowedSchemas) -> Result<CompiledStatement> {
  schemas.check(&req.target)?;
  let target = req.target.writable()?;

  let mut sql = Sql::raw("DELETE FROM ").then(target);
  if let Some(predicate) = compile_rules(req.rules.as_ref())? {
    sql = sql.raw_then(" WHERE ").then(predicate);
  }
  sql.push(req.returning.returning_clause());

  Ok(CompiledStatement {
    sql,
    fetch_result: req.returning.fetches(),
  })
}

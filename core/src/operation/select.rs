use serde_json::Value;
use shared::error::Result;

use super::{conjunction, AllowedSchemas, CompiledStatement, RelationTarget, ReturningSpec};
use crate::paginate::{order_clause, slice_condition, OrderItem, SliceSpec};
use crate::rules::compile_rules;
use crate::sql::Sql;

/// Typed fields of a `select` request.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectRequest {
  pub target: RelationTarget,
  pub rules: Option<Value>,
  pub returning: ReturningSpec,
  /// Empty when the request names no order.
  pub order: Vec<OrderItem>,
  pub slice: Option<SliceSpec>,
  pub limit: Option<u64>,
  pub require_updatable: bool,
}

impl SelectRequest {
  pub fn new(target: RelationTarget) -> Self {
    Self {
      target,
      rules: None,
      returning: ReturningSpec::All,
      order: Vec::new(),
      slice: None,
      limit: None,
      require_updatable: false,
    }
  }
}

pub fn compile_select(req: &SelectRequest, schemas: &AllowedSchemas) -> Result<CompiledStatement> {
  schemas.check(&req.target)?;

  let mut predicates = Vec::new();
  if let Some(rules) = compile_rules(req.rules.as_ref())? {
    predicates.push(rules);
  }

  let mut backward = false;
  if let Some(slice) = &req.slice {
    if let Some(condition) = slice_condition(slice, &req.order)? {
      predicates.push(condition);
    }
    backward = slice.runs_backward();
  }

  let columns = req.returning.select_list();
  let fetch_result = req.returning.fetches();

  // Rows before the boundary are fetched walking the order backward, then
  // re-sorted so the caller always sees forward order.
  let (inner_columns, inner_order) = if backward {
    (Sql::raw("*"), true)
  } else {
    (columns.clone(), false)
  };

  let mut sql = Sql::raw("SELECT ")
    .then(inner_columns)
    .raw_then(" FROM ")
    .then(req.target.from_item());

  if let Some(predicate) = conjunction(predicates) {
    sql = sql.raw_then(" WHERE ").then(predicate);
  }
  if !req.order.is_empty() {
    sql = sql.raw_then(" ").then(order_clause(&req.order, inner_order));
  }
  if let Some(limit) = req.limit {
    sql = sql
      .raw_then(" LIMIT ")
      .then(Sql::literal(Value::from(limit)));
  }
  if req.require_updatable {
    sql = sql.raw_then(" FOR SHARE");
  }

  if backward {
    sql = Sql::raw("SELECT ")
      .then(columns)
      .raw_then(" FROM ")
      .then(sql.parenthesized())
      .raw_then(" AS \"earlier\" ")
      .then(order_clause(&req.order, false));
  }

  Ok(CompiledStatement { sql, fetch_result })
}

//! Ordering and keyset pagination.
//!
//! The boundary algebra treats NULL as the smallest value of every column,
//! and `ORDER BY` places NULLs accordingly (`ASC NULLS FIRST`,
//! `DESC NULLS LAST`). With both sides agreeing, a `later` slice and an
//! `earlier` slice from the same boundary row partition the ordered set.

use serde_json::{Map, Value};
use shared::error::{Result, SluiceError};

use crate::sql::Sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
  #[default]
  Ascending,
  Descending,
}

impl SortDirection {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "ascending" => Some(Self::Ascending),
      "descending" => Some(Self::Descending),
      _ => None,
    }
  }

  fn inverted(self) -> Self {
    match self {
      Self::Ascending => Self::Descending,
      Self::Descending => Self::Ascending,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
  pub column: String,
  pub direction: SortDirection,
}

impl OrderItem {
  pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
    Self {
      column: column.into(),
      direction,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliceDirection {
  Earlier,
  #[default]
  Later,
}

impl SliceDirection {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "earlier" => Some(Self::Earlier),
      "later" => Some(Self::Later),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SliceSpec {
  pub relative_to: Option<Map<String, Value>>,
  pub direction: SliceDirection,
}

impl SliceSpec {
  /// Whether the query must run in inverted order.
  pub fn runs_backward(&self) -> bool {
    self.direction == SliceDirection::Earlier && self.relative_to.is_some()
  }
}

/// `ORDER BY ...` for `order`, optionally walking it backward.
pub fn order_clause(order: &[OrderItem], inverted: bool) -> Sql {
  let items = order.iter().map(|item| {
    let direction = if inverted {
      item.direction.inverted()
    } else {
      item.direction
    };
    let keyword = match direction {
      SortDirection::Ascending => " ASC NULLS FIRST",
      SortDirection::Descending => " DESC NULLS LAST",
    };
    Sql::ident(&item.column).raw_then(keyword)
  });
  Sql::raw("ORDER BY ").then(Sql::join(items, ", "))
}

/// The keyset predicate selecting rows strictly past the boundary.
///
/// Returns `None` for a `later` slice without a boundary, which is simply
/// the start of the ordered set.
pub fn slice_condition(slice: &SliceSpec, order: &[OrderItem]) -> Result<Option<Sql>> {
  if order.is_empty() {
    return Err(SluiceError::client("slice requires order"));
  }

  let boundary = match (&slice.relative_to, slice.direction) {
    (Some(boundary), _) => boundary,
    (None, SliceDirection::Later) => return Ok(None),
    (None, SliceDirection::Earlier) => {
      return Err(SluiceError::client(
        "relative-to must be set when direction is \"earlier\"",
      ))
    }
  };

  for key in boundary.keys() {
    if !order.iter().any(|item| &item.column == key) {
      return Err(SluiceError::client(format!(
        "slice relative-to column {key} is not in order"
      )));
    }
  }

  let mut chain = Sql::raw("FALSE");
  for item in order.iter().rev() {
    let value = boundary.get(&item.column).ok_or_else(|| {
      SluiceError::client(format!(
        "slice relative-to must contain column {}",
        item.column
      ))
    })?;

    let ascending = item.direction == SortDirection::Ascending;
    let forward_is_greater = ascending == (slice.direction == SliceDirection::Later);

    let past = if forward_is_greater {
      greater(&item.column, value)
    } else {
      less(&item.column, value)
    };

    chain = past
      .raw_then(" OR ")
      .then(equal(&item.column, value).raw_then(" AND ").then(chain).parenthesized())
      .parenthesized();
  }

  Ok(Some(chain))
}

// ── Boundary comparisons (NULL is the minimum) ─────────────────────

fn greater(column: &str, value: &Value) -> Sql {
  if value.is_null() {
    Sql::ident(column).raw_then(" IS NOT NULL")
  } else {
    Sql::ident(column)
      .raw_then(" > ")
      .then(Sql::literal(value.clone()))
  }
}

fn less(column: &str, value: &Value) -> Sql {
  if value.is_null() {
    Sql::raw("FALSE")
  } else {
    Sql::raw("COALESCE(")
      .then(Sql::ident(column))
      .raw_then(" < ")
      .then(Sql::literal(value.clone()))
      .raw_then(", TRUE)")
  }
}

fn equal(column: &str, value: &Value) -> Sql {
  if value.is_null() {
    Sql::ident(column).raw_then(" IS NULL")
  } else {
    Sql::ident(column)
      .raw_then(" = ")
      .then(Sql::literal(value.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn boundary(value: Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
  }

  fn later(value: Value) -> SliceSpec {
    SliceSpec {
      relative_to: boundary(value),
      direction: SliceDirection::Later,
    }
  }

  fn earlier(value: Value) -> SliceSpec {
    SliceSpec {
      relative_to: boundary(value),
      direction: SliceDirection::Earlier,
    }
  }

  fn asc(column: &str) -> OrderItem {
    OrderItem::new(column, SortDirection::Ascending)
  }

  fn desc(column: &str) -> OrderItem {
    OrderItem::new(column, SortDirection::Descending)
  }

  #[test]
  fn order_clause_honors_direction() {
    let order = [asc("a"), desc("b")];
    assert_eq!(
      order_clause(&order, false).render(),
      "ORDER BY \"a\" ASC NULLS FIRST, \"b\" DESC NULLS LAST"
    );
    assert_eq!(
      order_clause(&order, true).render(),
      "ORDER BY \"a\" DESC NULLS LAST, \"b\" ASC NULLS FIRST"
    );
  }

  #[test]
  fn single_column_later() {
    let sql = slice_condition(&later(json!({ "id": 5 })), &[asc("id")])
      .unwrap()
      .unwrap();
    assert_eq!(sql.render(), "(\"id\" > 5 OR (\"id\" = 5 AND FALSE))");
  }

  #[test]
  fn mixed_directions_nest_in_order() {
    let sql = slice_condition(&later(json!({ "a": 1, "b": "x" })), &[asc("a"), desc("b")])
      .unwrap()
      .unwrap();
    assert_eq!(
      sql.render(),
      "(\"a\" > 1 OR (\"a\" = 1 AND (COALESCE(\"b\" < 'x', TRUE) OR (\"b\" = 'x' AND FALSE))))"
    );
  }

  #[test]
  fn earlier_flips_every_comparison() {
    let sql = slice_condition(&earlier(json!({ "a": 1, "b": "x" })), &[asc("a"), desc("b")])
      .unwrap()
      .unwrap();
    assert_eq!(
      sql.render(),
      "(COALESCE(\"a\" < 1, TRUE) OR (\"a\" = 1 AND (\"b\" > 'x' OR (\"b\" = 'x' AND FALSE))))"
    );
  }

  #[test]
  fn null_boundary_is_the_minimum() {
    let sql = slice_condition(&later(json!({ "a": null })), &[asc("a")])
      .unwrap()
      .unwrap();
    assert_eq!(sql.render(), "(\"a\" IS NOT NULL OR (\"a\" IS NULL AND FALSE))");

    let sql = slice_condition(&earlier(json!({ "a": null })), &[asc("a")])
      .unwrap()
      .unwrap();
    assert_eq!(sql.render(), "(FALSE OR (\"a\" IS NULL AND FALSE))");
  }

  #[test]
  fn later_without_boundary_has_no_predicate() {
    assert!(slice_condition(&SliceSpec::default(), &[asc("id")])
      .unwrap()
      .is_none());
  }

  #[test]
  fn preconditions_are_client_errors() {
    let no_order = slice_condition(&later(json!({ "id": 1 })), &[]).unwrap_err();
    assert!(no_order.is_client_facing());

    let no_boundary = slice_condition(&earlier(Value::Null), &[asc("id")]).unwrap_err();
    assert_eq!(
      no_boundary.reply().unwrap().0,
      "relative-to must be set when direction is \"earlier\""
    );

    let stray = slice_condition(&later(json!({ "id": 1, "x": 2 })), &[asc("id")]).unwrap_err();
    assert!(stray.reply().unwrap().0.contains("column x"));

    let missing = slice_condition(&later(json!({ "a": 1 })), &[asc("a"), asc("b")]).unwrap_err();
    assert_eq!(missing.reply().unwrap().0, "slice relative-to must contain column b");
  }

  // ── Partition property, evaluated in memory ────────────────────

  type Row = Vec<Option<i64>>;

  /// Three-valued evaluation of the predicate shapes emitted above.
  fn past(row: &Row, order: &[OrderItem], b: &Row, dir: SliceDirection) -> bool {
    let mut result = Some(false);
    for i in (0..order.len()).rev() {
      let ascending = order[i].direction == SortDirection::Ascending;
      let greater = ascending == (dir == SliceDirection::Later);
      let cmp = match (b[i], greater) {
        (None, true) => Some(row[i].is_some()),
        (None, false) => Some(false),
        (Some(v), true) => row[i].map(|c| c > v),
        (Some(v), false) => Some(row[i].map_or(true, |c| c < v)),
      };
      let eq = match b[i] {
        None => Some(row[i].is_none()),
        Some(v) => row[i].map(|c| c == v),
      };
      let and = match (eq, result) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
      };
      result = match (cmp, and) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
      };
    }
    result == Some(true)
  }

  #[test]
  fn later_and_earlier_partition_the_set() {
    let order = [asc("a"), desc("b")];
    let values = [None, Some(1), Some(2)];
    let mut rows: Vec<Row> = Vec::new();
    for a in values {
      for b in values {
        rows.push(vec![a, b]);
      }
    }

    for boundary in &rows {
      let later: Vec<_> = rows
        .iter()
        .filter(|r| past(r, &order, boundary, SliceDirection::Later))
        .collect();
      let earlier: Vec<_> = rows
        .iter()
        .filter(|r| past(r, &order, boundary, SliceDirection::Earlier))
        .collect();

      assert!(later.iter().all(|r| !earlier.contains(r)));
      assert!(!later.contains(&boundary) && !earlier.contains(&boundary));
      assert_eq!(later.len() + earlier.len() + 1, rows.len(), "boundary {boundary:?}");
    }
  }
}

//! Compilation of operation requests into complete statements.
//!
//! Each `compile_*` function is pure: it takes typed request fields and
//! returns one statement plus whether its rows should be fetched.

pub mod private;
pub mod select;
pub mod target;
pub mod write;

pub use private::{canonical_representations_call, restore_session_call};
pub use select::{compile_select, SelectRequest};
pub use target::{AllowedSchemas, RelationTarget};
pub use write::{
  compile_delete, compile_insert, compile_update, DeleteRequest, InsertRequest, UpdateRequest,
};

use crate::sql::Sql;

/// A statement ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
  pub sql: Sql,
  /// When `false` the statement runs for its side effect only.
  pub fetch_result: bool,
}

/// Which columns a statement hands back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReturningSpec {
  /// Every column.
  #[default]
  All,
  /// No row data.
  Nothing,
  Columns(Vec<String>),
}

impl ReturningSpec {
  /// `None` maps to `All`, an empty list to `Nothing`.
  pub fn from_columns(columns: Option<Vec<String>>) -> Self {
    match columns {
      None => Self::All,
      Some(c) if c.is_empty() => Self::Nothing,
      Some(c) => Self::Columns(c),
    }
  }

  pub fn fetches(&self) -> bool {
    !matches!(self, Self::Nothing)
  }

  fn column_list(columns: &[String]) -> Sql {
    Sql::join(columns.iter().map(|c| Sql::ident(c)), ", ")
  }

  /// The select list.
  pub(crate) fn select_list(&self) -> Sql {
    match self {
      Self::All => Sql::raw("*"),
      Self::Nothing => Sql::raw("1"),
      Self::Columns(columns) => Self::column_list(columns),
    }
  }

  /// The `RETURNING` clause of a write, with its leading space.
  pub(crate) fn returning_clause(&self) -> Sql {
    match self {
      Self::All => Sql::raw(" RETURNING *"),
      Self::Nothing => Sql::new(),
      Self::Columns(columns) => Sql::raw(" RETURNING ").then(Self::column_list(columns)),
    }
  }
}

/// AND together optional predicates, parenthesizing each when there are
/// several.
pub(crate) fn conjunction(predicates: Vec<Sql>) -> Option<Sql> {
  match predicates.len() {
    0 => None,
    1 => predicates.into_iter().next(),
    _ => Some(Sql::join(
      predicates.into_iter().map(Sql::parenthesized),
      " AND ",
    )),
  }
}

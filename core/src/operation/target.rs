use serde_json::Value;
use shared::error::{Result, SluiceError};
use std::collections::HashSet;

use crate::sql::Sql;

/// What a statement reads from or writes to.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationTarget {
  Relation {
    schema: String,
    name: String,
  },
  Function {
    schema: String,
    name: String,
    arguments: Vec<Value>,
  },
}

impl RelationTarget {
  pub fn relation(schema: impl Into<String>, name: impl Into<String>) -> Self {
    Self::Relation {
      schema: schema.into(),
      name: name.into(),
    }
  }

  pub fn function(schema: impl Into<String>, name: impl Into<String>, arguments: Vec<Value>) -> Self {
    Self::Function {
      schema: schema.into(),
      name: name.into(),
      arguments,
    }
  }

  pub fn schema(&self) -> &str {
    match self {
      Self::Relation { schema, .. } | Self::Function { schema, .. } => schema,
    }
  }

  /// The target as it appears after `FROM`.
  pub(crate) fn from_item(&self) -> Sql {
    match self {
      Self::Relation { schema, name } => Sql::qualified(schema, name),
      Self::Function {
        schema,
        name,
        arguments,
      } => Sql::qualified(schema, name)
        .raw_then("(")
        .then(Sql::join(
          arguments.iter().cloned().map(Sql::literal),
          ", ",
        ))
        .raw_then(")"),
    }
  }

  /// The target of a write. Functions cannot be written to.
  pub(crate) fn writable(&self) -> Result<Sql> {
    match self {
      Self::Relation { schema, name } => Ok(Sql::qualified(schema, name)),
      Self::Function { .. } => Err(SluiceError::client(
        "function targets can only be selected from",
      )),
    }
  }
}

/// The schemas an endpoint's clients may address.
#[derive(Debug, Clone, Default)]
pub struct AllowedSchemas {
  schemas: HashSet<String>,
}

impl AllowedSchemas {
  pub fn new<I, S>(schemas: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      schemas: schemas.into_iter().map(Into::into).collect(),
    }
  }

  pub fn contains(&self, schema: &str) -> bool {
    self.schemas.contains(schema)
  }

  pub fn check(&self, target: &RelationTarget) -> Result<()> {
    if self.contains(target.schema()) {
      Ok(())
    } else {
      Err(SluiceError::client(
        "schema not in list of acceptable schemas",
      ))
    }
  }
}

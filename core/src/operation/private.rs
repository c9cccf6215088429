//! Calls into the helper functions installed in the private schema.

use serde_json::Value;

use crate::sql::Sql;

/// `SELECT "<schema>".restore_session(<session>, <note>)`
///
/// Runs on every pooled connection immediately before the statement it
/// was acquired for.
pub fn restore_session_call(private_schema: &str, session: &Value, note: Option<&str>) -> Sql {
  let note = note.map_or(Value::Null, |n| Value::String(n.to_string()));
  Sql::raw("SELECT ")
    .then(Sql::qualified(private_schema, "restore_session"))
    .raw_then("(")
    .then(Sql::literal(session.clone()))
    .raw_then(", ")
    .then(Sql::literal(note))
    .raw_then(")")
}

/// `SELECT "<schema>".get_canonical_representations(<types>::regtype[], <value>)::text`
pub fn canonical_representations_call(private_schema: &str, types: &[String], value: &str) -> Sql {
  let types = Value::Array(types.iter().cloned().map(Value::String).collect());
  Sql::raw("SELECT ")
    .then(Sql::qualified(private_schema, "get_canonical_representations"))
    .raw_then("(")
    .then(Sql::literal(types))
    .raw_then("::regtype[], ")
    .then(Sql::literal(Value::String(value.to_string())))
    .raw_then(")::text")
}

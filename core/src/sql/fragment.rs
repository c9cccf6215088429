//! Typed SQL fragments.
//!
//! A [`Sql`] value is a sequence of three kinds of pieces: static text
//! written in this codebase, identifiers, and literal values. There is no
//! constructor that accepts a runtime `&str` as SQL text, so client input
//! can only ever reach the statement as a quoted identifier or an escaped
//! literal.

use postgres_protocol::escape::{escape_identifier, escape_literal};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Piece {
  Text(&'static str),
  Ident(String),
  Literal(Value),
}

/// A composable, injection-safe SQL fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
  pieces: Vec<Piece>,
}

impl Sql {
  pub fn new() -> Self {
    Self { pieces: Vec::new() }
  }

  /// Static SQL text.
  pub fn raw(text: &'static str) -> Self {
    Self {
      pieces: vec![Piece::Text(text)],
    }
  }

  /// A double-quoted identifier.
  pub fn ident(name: &str) -> Self {
    Self {
      pieces: vec![Piece::Ident(name.to_string())],
    }
  }

  /// `"schema"."name"`
  pub fn qualified(schema: &str, name: &str) -> Self {
    Self::ident(schema).raw_then(".").then(Self::ident(name))
  }

  /// A literal value, escaped at render time.
  pub fn literal(value: Value) -> Self {
    Self {
      pieces: vec![Piece::Literal(value)],
    }
  }

  /// Append another fragment.
  pub fn then(mut self, other: Sql) -> Self {
    self.pieces.extend(other.pieces);
    self
  }

  /// Append static text.
  pub fn raw_then(mut self, text: &'static str) -> Self {
    self.pieces.push(Piece::Text(text));
    self
  }

  pub fn push(&mut self, other: Sql) {
    self.pieces.extend(other.pieces);
  }

  pub fn push_raw(&mut self, text: &'static str) {
    self.pieces.push(Piece::Text(text));
  }

  /// Join fragments with a static separator.
  pub fn join<I>(parts: I, separator: &'static str) -> Self
  where
    I: IntoIterator<Item = Sql>,
  {
    let mut out = Sql::new();
    for (i, part) in parts.into_iter().enumerate() {
      if i > 0 {
        out.push_raw(separator);
      }
      out.push(part);
    }
    out
  }

  /// Wrap in parentheses.
  pub fn parenthesized(self) -> Self {
    Sql::raw("(").then(self).raw_then(")")
  }

  pub fn is_empty(&self) -> bool {
    self.pieces.is_empty()
  }

  /// Number of literal values bound into this fragment.
  pub fn literal_count(&self) -> usize {
    self
      .pieces
      .iter()
      .filter(|p| matches!(p, Piece::Literal(_)))
      .count()
  }

  /// The literal values bound into this fragment, in order.
  pub fn literals(&self) -> impl Iterator<Item = &Value> {
    self.pieces.iter().filter_map(|p| match p {
      Piece::Literal(v) => Some(v),
      _ => None,
    })
  }

  /// Render to SQL text.
  pub fn render(&self) -> String {
    let mut buf = String::with_capacity(128);
    for piece in &self.pieces {
      match piece {
        Piece::Text(text) => buf.push_str(text),
        Piece::Ident(name) => buf.push_str(&escape_identifier(name)),
        Piece::Literal(value) => emit_literal(value, &mut buf),
      }
    }
    buf
  }
}

impl fmt::Display for Sql {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.render())
  }
}

fn emit_literal(value: &Value, buf: &mut String) {
  match value {
    Value::Null => buf.push_str("NULL"),
    Value::Bool(true) => buf.push_str("TRUE"),
    Value::Bool(false) => buf.push_str("FALSE"),
    Value::Number(n) => buf.push_str(&n.to_string()),
    Value::String(s) => push_escaped(&escape_literal(s), buf),
    // An empty ARRAY[] has no element type; an untyped '{}' adopts the
    // type of whatever it is compared with or assigned to.
    Value::Array(items) if items.is_empty() => buf.push_str("'{}'"),
    Value::Array(items) => {
      buf.push_str("ARRAY[");
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          buf.push_str(", ");
        }
        emit_literal(item, buf);
      }
      buf.push(']');
    }
    Value::Object(_) => push_escaped(&escape_literal(&value.to_string()), buf),
  }
}

/// `escape_literal` leads an `E''` literal with a space so it cannot fuse
/// with a preceding word; skip it when the text already ends in a separator.
fn push_escaped(escaped: &str, buf: &mut String) {
  let separated =
    buf.is_empty() || buf.ends_with(|c: char| c.is_whitespace() || "([,".contains(c));
  if separated {
    buf.push_str(escaped.trim_start());
  } else {
    buf.push_str(escaped);
  }
}

use serde_json::Value;
use shared::error::{Result, SluiceError};

use super::node::{Operator, RuleNode};
use super::querybuilder;
use crate::sql::Sql;

/// Parse and compile a client rule tree.
///
/// `None` and JSON `null` mean "no filter" and compile to `None`.
pub fn compile_rules(raw: Option<&Value>) -> Result<Option<Sql>> {
  let raw = match raw {
    None | Some(Value::Null) => return Ok(None),
    Some(raw) => raw,
  };
  let node = querybuilder::parse(raw)
    .map_err(|e| SluiceError::client(format!("Failed to parse query-rules: {e}")))?;
  Ok(Some(compile(&node)))
}

/// Compile a parsed rule tree to a predicate.
pub fn compile(node: &RuleNode) -> Sql {
  match node {
    RuleNode::Condition {
      column,
      operator,
      value,
    } => condition(column, *operator, value),
    RuleNode::Group {
      combinator,
      negated,
      rules,
    } => {
      let inner = match rules.len() {
        0 => Sql::raw(combinator.identity()),
        1 => compile(&rules[0]),
        _ => Sql::join(rules.iter().map(compile), combinator.separator()).parenthesized(),
      };
      if *negated {
        Sql::raw("NOT ").then(parenthesize_once(inner, rules.len()))
      } else {
        inner
      }
    }
  }
}

fn parenthesize_once(inner: Sql, children: usize) -> Sql {
  if children > 1 {
    inner
  } else {
    inner.parenthesized()
  }
}

fn condition(column: &str, operator: Operator, value: &Value) -> Sql {
  let col = Sql::ident(column);
  let lit = || Sql::literal(value.clone());
  match operator {
    Operator::Equal => col.raw_then(" = ").then(lit()),
    Operator::NotEqual => col.raw_then(" <> ").then(lit()),
    Operator::Less => col.raw_then(" < ").then(lit()),
    Operator::LessOrEqual => col.raw_then(" <= ").then(lit()),
    Operator::Greater => col.raw_then(" > ").then(lit()),
    Operator::GreaterOrEqual => col.raw_then(" >= ").then(lit()),
    Operator::In => col.raw_then(" = ANY(").then(lit()).raw_then(")"),
    Operator::NotIn => Sql::raw("NOT (")
      .then(col)
      .raw_then(" = ANY(")
      .then(lit())
      .raw_then("))"),
    Operator::Between => range(col, " BETWEEN ", value),
    Operator::NotBetween => range(col, " NOT BETWEEN ", value),
    Operator::BeginsWith => like(col, " LIKE ", value, "", "%"),
    Operator::NotBeginsWith => like(col, " NOT LIKE ", value, "", "%"),
    Operator::Contains => like(col, " LIKE ", value, "%", "%"),
    Operator::NotContains => like(col, " NOT LIKE ", value, "%", "%"),
    Operator::EndsWith => like(col, " LIKE ", value, "%", ""),
    Operator::NotEndsWith => like(col, " NOT LIKE ", value, "%", ""),
    Operator::IsEmpty => col.raw_then(" = ''"),
    Operator::IsNotEmpty => col.raw_then(" <> ''"),
    Operator::IsNull => col.raw_then(" IS NULL"),
    Operator::IsNotNull => col.raw_then(" IS NOT NULL"),
  }
}

fn range(col: Sql, keyword: &'static str, value: &Value) -> Sql {
  let (low, high) = match value.as_array().map(Vec::as_slice) {
    Some([low, high]) => (low.clone(), high.clone()),
    _ => (Value::Null, Value::Null),
  };
  col
    .raw_then(keyword)
    .then(Sql::literal(low))
    .raw_then(" AND ")
    .then(Sql::literal(high))
}

/// The pattern is assembled here so the client text stays one literal.
fn like(col: Sql, keyword: &'static str, value: &Value, prefix: &str, suffix: &str) -> Sql {
  let text = value.as_str().unwrap_or_default();
  let pattern = format!("{prefix}{}{suffix}", escape_like(text));
  col.raw_then(keyword).then(Sql::literal(Value::String(pattern)))
}

fn escape_like(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

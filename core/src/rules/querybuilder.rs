//! Adaptor for the jQuery QueryBuilder rule format.
//!
//! Groups look like `{"condition": "AND", "not": false, "rules": [...]}` and
//! leaves like `{"field": "age", "operator": "greater", "value": 21}`. The
//! builder emits `id` alongside `field`; either is accepted.

use serde_json::{Map, Value};
use thiserror::Error;

use super::node::{Combinator, Operand, Operator, RuleNode};

#[derive(Debug, Error, PartialEq)]
pub enum RuleParseError {
  #[error("rule must be an object")]
  NotAnObject,

  #[error("condition must be \"AND\" or \"OR\", got {0}")]
  BadCombinator(String),

  #[error("rules must be a list")]
  RulesNotAList,

  #[error("not must be a boolean")]
  BadNegation,

  #[error("rule is missing its field")]
  MissingField,

  #[error("unknown operator {0:?}")]
  UnknownOperator(String),

  #[error("operator {operator} expects {expected}")]
  BadValue {
    operator: Operator,
    expected: &'static str,
  },
}

/// Parse a client-supplied rule tree.
pub fn parse(raw: &Value) -> Result<RuleNode, RuleParseError> {
  let obj = raw.as_object().ok_or(RuleParseError::NotAnObject)?;
  if obj.contains_key("rules") || obj.contains_key("condition") {
    parse_group(obj)
  } else {
    parse_condition(obj)
  }
}

fn parse_group(obj: &Map<String, Value>) -> Result<RuleNode, RuleParseError> {
  let combinator = match obj.get("condition") {
    None | Some(Value::Null) => Combinator::And,
    Some(Value::String(s)) => match s.to_ascii_uppercase().as_str() {
      "AND" => Combinator::And,
      "OR" => Combinator::Or,
      _ => return Err(RuleParseError::BadCombinator(s.clone())),
    },
    Some(other) => return Err(RuleParseError::BadCombinator(other.to_string())),
  };

  let negated = match obj.get("not") {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => *b,
    Some(_) => return Err(RuleParseError::BadNegation),
  };

  let rules = match obj.get("rules") {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(items)) => items.iter().map(parse).collect::<Result<_, _>>()?,
    Some(_) => return Err(RuleParseError::RulesNotAList),
  };

  Ok(RuleNode::Group {
    combinator,
    negated,
    rules,
  })
}

fn parse_condition(obj: &Map<String, Value>) -> Result<RuleNode, RuleParseError> {
  let column = obj
    .get("field")
    .or_else(|| obj.get("id"))
    .and_then(Value::as_str)
    .filter(|s| !s.is_empty())
    .ok_or(RuleParseError::MissingField)?
    .to_string();

  let name = obj
    .get("operator")
    .and_then(Value::as_str)
    .unwrap_or("equal");
  let operator =
    Operator::from_name(name).ok_or_else(|| RuleParseError::UnknownOperator(name.to_string()))?;

  let value = obj.get("value").cloned().unwrap_or(Value::Null);
  let value = check_operand(operator, value)?;

  Ok(RuleNode::Condition {
    column,
    operator,
    value,
  })
}

fn check_operand(operator: Operator, value: Value) -> Result<Value, RuleParseError> {
  let bad = |expected| RuleParseError::BadValue { operator, expected };
  match operator.operand() {
    Operand::None => Ok(Value::Null),
    Operand::Scalar => match value {
      Value::Array(_) | Value::Object(_) => Err(bad("a single value")),
      v => Ok(v),
    },
    // A lone scalar is promoted to a one-element list.
    Operand::List => match value {
      Value::Array(items) => Ok(Value::Array(items)),
      Value::Object(_) | Value::Null => Err(bad("a list of values")),
      v => Ok(Value::Array(vec![v])),
    },
    Operand::Range => match value {
      Value::Array(items) if items.len() == 2 => Ok(Value::Array(items)),
      _ => Err(bad("a list of two values")),
    },
    Operand::Text => match value {
      Value::String(s) => Ok(Value::String(s)),
      _ => Err(bad("a string")),
    },
  }
}

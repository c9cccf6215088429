//! Typed access to request fields.
//!
//! Every function validates one field of the envelope and fails with a
//! client error naming that field. Absent and `null` are treated alike.

use serde_json::{Map, Value};
use shared::error::{Result, SluiceError};
use sluice_core::format::ResultFormat;
use sluice_core::operation::{RelationTarget, ReturningSpec};
use sluice_core::paginate::{OrderItem, SliceDirection, SliceSpec, SortDirection};

type Fields = Map<String, Value>;

fn get<'a>(fields: &'a Fields, key: &str) -> Option<&'a Value> {
  fields.get(key).filter(|v| !v.is_null())
}

fn non_empty_str<'a>(value: Option<&'a Value>, message: &str) -> Result<&'a str> {
  value
    .and_then(Value::as_str)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| SluiceError::client(message))
}

fn schema(fields: &Fields) -> Result<String> {
  non_empty_str(get(fields, "schema"), "schema must be a string").map(str::to_string)
}

// ── Targets ────────────────────────────────────────────────────────

/// `schema` + `relation`.
pub fn relation(fields: &Fields) -> Result<RelationTarget> {
  let schema = schema(fields)?;
  let name = non_empty_str(get(fields, "relation"), "relation must be a string")?;
  Ok(RelationTarget::relation(schema, name))
}

/// `schema` + `function: {name, arguments}`.
pub fn function(fields: &Fields) -> Result<RelationTarget> {
  let schema = schema(fields)?;
  let function = get(fields, "function")
    .and_then(Value::as_object)
    .ok_or_else(|| SluiceError::client("function must be a dictionary"))?;
  let name = non_empty_str(function.get("name"), "function name must be a string")?;
  let arguments = match function.get("arguments") {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(items)) => items.clone(),
    Some(_) => {
      return Err(SluiceError::client(
        "function arguments must be a list or null",
      ))
    }
  };
  Ok(RelationTarget::function(schema, name, arguments))
}

/// Exactly one of `relation` and `function`.
pub fn select_target(fields: &Fields) -> Result<RelationTarget> {
  match (fields.contains_key("relation"), fields.contains_key("function")) {
    (true, false) => relation(fields),
    (false, true) => function(fields),
    _ => Err(SluiceError::client(
      "Exactly one of \"relation\" and \"function\" must be supplied",
    )),
  }
}

// ── Shaping ────────────────────────────────────────────────────────

pub fn query_rules(fields: &Fields) -> Option<Value> {
  get(fields, "query-rules").cloned()
}

pub fn returning(fields: &Fields) -> Result<ReturningSpec> {
  let Some(value) = get(fields, "returning-columns") else {
    return Ok(ReturningSpec::All);
  };
  let items = value
    .as_array()
    .ok_or_else(|| SluiceError::client("returning-columns must be a list or null"))?;
  let columns = items
    .iter()
    .map(|item| {
      item
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SluiceError::client("returning-columns list items must be strings"))
    })
    .collect::<Result<Vec<_>>>()?;
  Ok(ReturningSpec::from_columns(Some(columns)))
}

pub fn result_format(fields: &Fields) -> Result<ResultFormat> {
  match get(fields, "result-format") {
    None => Ok(ResultFormat::Json),
    Some(Value::String(s)) => s.parse(),
    Some(_) => Err(SluiceError::client("result-format must be a string or null")),
  }
}

/// Empty when no order was given.
pub fn order(fields: &Fields) -> Result<Vec<OrderItem>> {
  let Some(value) = get(fields, "order") else {
    return Ok(Vec::new());
  };
  let items = value
    .as_array()
    .ok_or_else(|| SluiceError::client("order must be a list or null"))?;
  if items.is_empty() {
    return Err(SluiceError::client("order list must not be empty"));
  }

  items
    .iter()
    .map(|item| {
      let item = item
        .as_object()
        .ok_or_else(|| SluiceError::client("order list items must be dictionaries"))?;
      let column = non_empty_str(item.get("column"), "column must be a string")?;
      let direction = match item.get("direction") {
        None | Some(Value::Null) => SortDirection::Ascending,
        Some(Value::String(s)) => SortDirection::from_name(s).ok_or_else(|| {
          SluiceError::client("direction must be one of \"ascending\", \"descending\"")
        })?,
        Some(_) => return Err(SluiceError::client("direction must be a string or null")),
      };
      Ok(OrderItem::new(column, direction))
    })
    .collect()
}

pub fn limit(fields: &Fields) -> Result<Option<u64>> {
  let Some(value) = get(fields, "limit") else {
    return Ok(None);
  };
  let Some(n) = value.as_i64() else {
    return Err(SluiceError::client("limit must be an integer or null"));
  };
  if n < 1 {
    return Err(SluiceError::client(
      "limit must be a non-zero positive integer",
    ));
  }
  Ok(Some(n as u64))
}

pub fn slice(fields: &Fields) -> Result<Option<SliceSpec>> {
  let Some(value) = get(fields, "slice") else {
    return Ok(None);
  };
  let slice = value
    .as_object()
    .ok_or_else(|| SluiceError::client("slice must be a dictionary or null"))?;

  let relative_to = match slice.get("relative-to") {
    None | Some(Value::Null) => None,
    Some(Value::Object(boundary)) => Some(boundary.clone()),
    Some(_) => {
      return Err(SluiceError::client(
        "slice relative-to must be a dictionary or null",
      ))
    }
  };

  let direction = match slice.get("direction") {
    None | Some(Value::Null) => SliceDirection::Later,
    Some(Value::String(s)) => SliceDirection::from_name(s).ok_or_else(|| {
      SluiceError::client("direction must be one of \"earlier\", \"later\"")
    })?,
    Some(_) => {
      return Err(SluiceError::client(
        "slice direction must be a string or null",
      ))
    }
  };

  if direction == SliceDirection::Earlier && relative_to.is_none() {
    return Err(SluiceError::client(
      "relative-to must be set when direction is \"earlier\"",
    ));
  }

  Ok(Some(SliceSpec {
    relative_to,
    direction,
  }))
}

pub fn chronicle_note(fields: &Fields) -> Result<Option<String>> {
  match get(fields, "chronicle-note") {
    None => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(_) => Err(SluiceError::client("chronicle-note must be a string or null")),
  }
}

pub fn require_updatable(fields: &Fields) -> Result<bool> {
  match get(fields, "require-updatable") {
    None => Ok(false),
    Some(Value::Bool(b)) => Ok(*b),
    Some(_) => Err(SluiceError::client(
      "require-updatable must be a boolean or null",
    )),
  }
}

// ── Writes ─────────────────────────────────────────────────────────

pub fn rows(fields: &Fields) -> Result<Vec<Map<String, Value>>> {
  let items = get(fields, "rows")
    .and_then(Value::as_array)
    .ok_or_else(|| SluiceError::client("rows must be a list"))?;
  if items.is_empty() {
    return Err(SluiceError::client("rows list must not be empty"));
  }
  items
    .iter()
    .map(|item| {
      let row = item
        .as_object()
        .ok_or_else(|| SluiceError::client("rows list items must be dictionaries"))?;
      if row.is_empty() {
        return Err(SluiceError::client("row dictionary must not be empty"));
      }
      Ok(row.clone())
    })
    .collect()
}

pub fn updates(fields: &Fields) -> Result<Map<String, Value>> {
  let updates = get(fields, "updates")
    .and_then(Value::as_object)
    .ok_or_else(|| SluiceError::client("updates must be a dictionary"))?;
  if updates.is_empty() {
    return Err(SluiceError::client("updates must not be empty"));
  }
  Ok(updates.clone())
}

// ── Session operations ─────────────────────────────────────────────

pub fn channel(fields: &Fields) -> Result<String> {
  non_empty_str(get(fields, "channel"), "channel must be a string").map(str::to_string)
}

pub fn issuer(fields: &Fields) -> Result<String> {
  non_empty_str(get(fields, "issuer"), "issuer must be a string").map(str::to_string)
}

pub fn token(fields: &Fields) -> Result<Option<String>> {
  match get(fields, "token") {
    None => Ok(None),
    Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
    Some(_) => Err(SluiceError::client("token must be a string or null")),
  }
}

pub fn types(fields: &Fields) -> Result<Vec<String>> {
  let items = get(fields, "types")
    .and_then(Value::as_array)
    .ok_or_else(|| SluiceError::client("types must be a list"))?;
  items
    .iter()
    .map(|item| {
      non_empty_str(Some(item), "types list items must be strings").map(str::to_string)
    })
    .collect()
}

pub fn value(fields: &Fields) -> Result<String> {
  match fields.get("value") {
    Some(Value::String(s)) => Ok(s.clone()),
    _ => Err(SluiceError::client("value must be a string")),
  }
}

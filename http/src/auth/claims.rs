use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The decoded, validated claims of one issuer.
///
/// Only the expiry is interpreted here; everything else is carried as-is
/// into the session state for the database to inspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
  /// Unix timestamp (seconds) after which the claims are void.
  #[serde(rename = "expiry-timestamp")]
  pub expiry_timestamp: i64,
  /// Issuer-specific claims.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl ClaimSet {
  pub fn new(expiry_timestamp: i64) -> Self {
    Self {
      expiry_timestamp,
      extra: Map::new(),
    }
  }

  pub fn with_claim(mut self, name: &str, value: Value) -> Self {
    self.extra.insert(name.to_string(), value);
    self
  }
}

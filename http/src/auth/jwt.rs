use anyhow::Context;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use shared::config::IssuerConfig;
use shared::error::{Result, SluiceError};
use std::str::FromStr;

use super::{ClaimSet, ClaimsDecoder};

/// An issuer whose tokens are signed JWTs verified with a public key.
pub struct JwtIssuer {
  key: DecodingKey,
  validation: Validation,
}

impl JwtIssuer {
  pub fn from_config(name: &str, cfg: &IssuerConfig) -> anyhow::Result<Self> {
    let pem = std::fs::read(&cfg.public_key_path)
      .with_context(|| format!("issuer {}: reading {}", name, cfg.public_key_path))?;
    Self::from_pem(name, cfg, &pem)
  }

  /// Build from an in-memory PEM public key; `cfg.public_key_path` is ignored.
  pub fn from_pem(name: &str, cfg: &IssuerConfig, pem: &[u8]) -> anyhow::Result<Self> {
    let algorithm = Algorithm::from_str(&cfg.algorithm)
      .map_err(|_| anyhow::anyhow!("issuer {}: unknown algorithm {}", name, cfg.algorithm))?;

    let key = match algorithm {
      Algorithm::RS256
      | Algorithm::RS384
      | Algorithm::RS512
      | Algorithm::PS256
      | Algorithm::PS384
      | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
      Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
      Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
      Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
        anyhow::bail!("issuer {}: symmetric algorithms are not supported", name)
      }
    }
    .with_context(|| format!("issuer {}: invalid public key", name))?;

    let mut validation = Validation::new(algorithm);
    validation.leeway = cfg.leeway_secs;
    validation.set_required_spec_claims(&["exp"]);
    match &cfg.audience {
      Some(audience) => validation.set_audience(audience),
      None => validation.validate_aud = false,
    }

    Ok(Self { key, validation })
  }
}

impl ClaimsDecoder for JwtIssuer {
  fn decode(&self, token: &str) -> Result<ClaimSet> {
    let data = jsonwebtoken::decode::<Map<String, Value>>(token, &self.key, &self.validation)
      .map_err(|e| SluiceError::client(format!("Invalid JWT: {e}")))?;
    into_claim_set(data.claims)
  }
}

/// Move `exp` out of the payload into the typed expiry.
fn into_claim_set(mut payload: Map<String, Value>) -> Result<ClaimSet> {
  let expiry = payload
    .remove("exp")
    .and_then(|exp| exp.as_f64())
    .ok_or_else(|| SluiceError::client("Invalid JWT: exp must be a number"))?;
  Ok(ClaimSet {
    expiry_timestamp: expiry.floor() as i64,
    extra: payload,
  })
}

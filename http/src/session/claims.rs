use dashmap::mapref::entry::Entry;
use shared::error::{Result, SluiceError};
use shared::protocol::ServerFrame;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{ClaimEntry, Session};
use crate::auth::IssuerRegistry;

impl Session {
  /// Apply (or with `None`, withdraw) an issuer's token.
  ///
  /// Returns the whole seconds until the claims expire. Applying a token
  /// for an issuer that already has claims replaces them and reschedules
  /// the single expiry timer for that issuer.
  pub fn apply_claims(
    self: &Arc<Self>,
    issuers: &IssuerRegistry,
    issuer: &str,
    token: Option<&str>,
  ) -> Result<Option<i64>> {
    let decoder = issuers
      .get(issuer)
      .ok_or_else(|| SluiceError::client(format!("JWT issuer {issuer:?} is not defined")))?;

    let Some(token) = token else {
      if let Some((_, old)) = self.claims.remove(issuer) {
        old.timer.abort();
        info!(session = self.id, issuer, "claims withdrawn");
      }
      return Ok(None);
    };

    let claims = decoder.decode(token)?;

    let now_ms = chrono::Utc::now().timestamp_millis();
    let remaining_ms = claims.expiry_timestamp.saturating_mul(1000) - now_ms;
    let delay = Duration::from_millis(remaining_ms.max(0) as u64);

    let generation = self.claim_generation.fetch_add(1, Ordering::Relaxed);
    let weak = Arc::downgrade(self);
    let owned_issuer = issuer.to_string();

    // The slot stays locked until the entry is in place, so a timer that
    // fires immediately still finds its generation.
    let slot = self.claims.entry(issuer.to_string());
    let timer = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      if let Some(session) = weak.upgrade() {
        session.expire_claims(&owned_issuer, generation);
      }
    })
    .abort_handle();

    let entry = ClaimEntry {
      claims,
      generation,
      timer,
    };
    match slot {
      Entry::Occupied(mut occupied) => occupied.insert(entry).timer.abort(),
      Entry::Vacant(vacant) => {
        vacant.insert(entry);
      }
    }

    info!(session = self.id, issuer, expires_in_ms = remaining_ms, "claims applied");
    Ok(Some(remaining_ms.div_euclid(1000).max(0)))
  }

  fn expire_claims(&self, issuer: &str, generation: u64) {
    if self.is_dead() {
      return;
    }
    let expired = self
      .claims
      .remove_if(issuer, |_, entry| entry.generation == generation)
      .is_some();
    if expired {
      info!(session = self.id, issuer, "claims expired");
      self.send(ServerFrame::IssuerClaimsExpired {
        issuer: issuer.to_string(),
      });
    }
  }

  /// Number of live expiry timers.
  pub fn active_timers(&self) -> usize {
    self
      .claims
      .iter()
      .filter(|entry| !entry.timer.is_finished())
      .count()
  }
}

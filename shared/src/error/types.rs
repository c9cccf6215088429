use serde_json::{json, Value};
use thiserror::Error;

/// Top-level error type for the sluice gateway.
///
/// The variants follow the boundary at which an error is reported to the
/// client. `Protocol` poisons the whole connection, `Client` and `Backend`
/// become a `failed` reply carrying their reason, and `Internal` becomes a
/// redacted `failed` reply while the real cause is only logged.
#[derive(Debug, Error)]
pub enum SluiceError {
    // ── Protocol ───────────────────────────────────────────────
    #[error("protocol: {0}")]
    Protocol(String),

    // ── Client ─────────────────────────────────────────────────
    #[error("{reason}")]
    Client { reason: String },

    // ── Backend ────────────────────────────────────────────────
    /// The compiled statement was rejected by the database. `diagnostics`
    /// holds the structured error fields reported by the backend.
    #[error("{message}")]
    Backend { message: String, diagnostics: Value },

    // ── Config ─────────────────────────────────────────────────
    #[error("config: invalid value for '{key}': {reason}")]
    ConfigInvalid { key: String, reason: String },

    // ── Generic ────────────────────────────────────────────────
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SluiceError {
    /// A client-attributable failure.
    pub fn client(reason: impl Into<String>) -> Self {
        Self::Client {
            reason: reason.into(),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol(reason.into())
    }

    /// Returns `true` for errors whose text may be shown to the client.
    pub fn is_client_facing(&self) -> bool {
        matches!(self, Self::Client { .. } | Self::Backend { .. })
    }

    /// The `(reason, detail)` pair to put in a `failed` reply.
    ///
    /// Returns `None` for errors that must be redacted.
    pub fn reply(&self) -> Option<(String, Option<Value>)> {
        match self {
            Self::Client { reason } => Some((reason.clone(), None)),
            Self::Backend {
                message,
                diagnostics,
            } => Some((
                message.clone(),
                Some(json!({ "postgresql": diagnostics })),
            )),
            Self::Protocol(_) | Self::ConfigInvalid { .. } | Self::Internal(_) => None,
        }
    }
}

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// Close code sent when a frame cannot be decoded as an envelope.
pub const PROTOCOL_ERROR_CLOSE_CODE: u16 = 4002;

/// A piece of text that is already valid JSON.
///
/// Results produced by the database are JSON already; wrapping them in
/// this type lets the reply be assembled without decoding and re-encoding
/// a potentially large result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLiteral(String);

impl JsonLiteral {
    /// Trust `text` to be valid JSON.
    ///
    /// Only for text produced by serde_json or by the database's own
    /// JSON functions.
    pub fn from_trusted(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Serialize any value.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_string(value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every frame the server sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Succeeded {
        id: String,
        result: Option<JsonLiteral>,
    },
    Failed {
        id: String,
        reason: String,
        detail: Option<Value>,
    },
    DatabaseReadiness {
        ready: bool,
    },
    IssuerClaimsExpired {
        issuer: String,
    },
    Notification {
        channel: String,
        payload: String,
    },
}

impl ServerFrame {
    /// Encode the frame as a JSON text message.
    pub fn encode(&self) -> String {
        match self {
            // Hand-assembled so the already-encoded result is spliced in.
            Self::Succeeded { id, result } => {
                let id = Value::String(id.clone());
                let result = result.as_ref().map_or("null", JsonLiteral::as_str);
                format!(r#"{{"type":"succeeded","id":{id},"result":{result}}}"#)
            }
            Self::Failed { id, reason, detail } => {
                let mut frame = json!({
                    "type": "failed",
                    "id": id,
                    "reason": reason,
                });
                if let Some(detail) = detail {
                    frame["detail"] = detail.clone();
                }
                frame.to_string()
            }
            Self::DatabaseReadiness { ready } => json!({
                "type": "database-readiness",
                "ready": ready,
            })
            .to_string(),
            Self::IssuerClaimsExpired { issuer } => json!({
                "type": "issuer-claims-expired",
                "issuer": issuer,
            })
            .to_string(),
            Self::Notification { channel, payload } => json!({
                "type": "notification",
                "channel": channel,
                "payload": payload,
            })
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn succeeded_splices_result_without_reencoding() {
        let frame = ServerFrame::Succeeded {
            id: "q\"1".into(),
            result: Some(JsonLiteral::from_trusted(r#"[{"id":1}]"#)),
        };
        let text = frame.encode();
        assert!(text.contains(r#""result":[{"id":1}]"#), "got: {text}");
        let value = decode(&text);
        assert_eq!(value["id"], "q\"1");
        assert_eq!(value["result"][0]["id"], 1);
    }

    #[test]
    fn succeeded_without_result_is_null() {
        let frame = ServerFrame::Succeeded {
            id: "2".into(),
            result: None,
        };
        assert_eq!(decode(&frame.encode())["result"], Value::Null);
    }

    #[test]
    fn failed_omits_missing_detail() {
        let frame = ServerFrame::Failed {
            id: "3".into(),
            reason: "Internal server error".into(),
            detail: None,
        };
        let value = decode(&frame.encode());
        assert_eq!(value["type"], "failed");
        assert!(value.get("detail").is_none());
    }

    #[test]
    fn unsolicited_frames_have_their_type() {
        let ready = decode(&ServerFrame::DatabaseReadiness { ready: true }.encode());
        assert_eq!(ready["type"], "database-readiness");
        assert_eq!(ready["ready"], true);

        let note = decode(
            &ServerFrame::Notification {
                channel: "orders".into(),
                payload: "42".into(),
            }
            .encode(),
        );
        assert_eq!(note["channel"], "orders");
        assert_eq!(note["payload"], "42");
    }
}

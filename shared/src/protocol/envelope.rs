use serde_json::{Map, Value};

use crate::error::SluiceError;

/// A decoded client request: `{"type": ..., "id": ..., ...fields}`.
///
/// `kind` and `id` are removed from the object; everything else stays in
/// `fields` for the handler to extract.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub kind: String,
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Decode a raw text frame.
    ///
    /// Any failure is a `Protocol` error: without a well-formed `id` there
    /// is no way to address a reply, so the connection has to go.
    pub fn decode(raw: &str) -> Result<Self, SluiceError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| SluiceError::protocol(format!("message is not valid JSON: {e}")))?;

        let Value::Object(mut fields) = value else {
            return Err(SluiceError::protocol("message must be an object"));
        };

        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(SluiceError::protocol("type must be a string")),
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            _ => return Err(SluiceError::protocol("id must be a string")),
        };

        Ok(Self { kind, id, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_type_id_and_fields() {
        let env = Envelope::decode(r#"{"type":"select","id":"7","schema":"app"}"#).unwrap();
        assert_eq!(env.kind, "select");
        assert_eq!(env.id, "7");
        assert_eq!(env.fields.get("schema").unwrap(), "app");
        assert!(!env.fields.contains_key("type"));
        assert!(!env.fields.contains_key("id"));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            Envelope::decode("[1,2]"),
            Err(SluiceError::Protocol(_))
        ));
        assert!(matches!(
            Envelope::decode("not json"),
            Err(SluiceError::Protocol(_))
        ));
    }

    #[test]
    fn rejects_missing_or_non_string_id() {
        assert!(Envelope::decode(r#"{"type":"select"}"#).is_err());
        assert!(Envelope::decode(r#"{"type":"select","id":5}"#).is_err());
        assert!(Envelope::decode(r#"{"type":null,"id":"5"}"#).is_err());
    }
}

//! Wire envelopes exchanged with transports.
//!
//! Field names are the short wire names (`fn`, `p`, `json`, `r`, `e`);
//! absent optional fields are omitted when serialized.

use serde::{Deserialize, Deserializer, Serialize};

use crate::value::Value;

/// Route name transports install the dispatch endpoint under unless the host
/// overrides it.
pub const DEFAULT_ENDPOINT_PATH: &str = "/__kairpc_endpoint";

/// Deserializes a field that may be absent or explicitly `null` into its default.
fn deserialize_null_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single incoming call.
///
/// `params` and a non-empty `raw_payload` are mutually exclusive; the
/// dispatcher rejects requests carrying both.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    /// Operation name, plain (`echo`) or object-qualified (`acct.Login`).
    #[serde(rename = "fn")]
    pub operation: String,
    #[serde(
        rename = "p",
        skip_serializing_if = "Vec::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub params: Vec<Value>,
    #[serde(rename = "json", skip_serializing_if = "Option::is_none", default)]
    pub raw_payload: Option<String>,
}

impl RequestEnvelope {
    /// Creates a positional-mode request.
    #[must_use]
    pub fn new(operation: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            operation: operation.into(),
            params,
            ..Self::default()
        }
    }

    /// Creates a raw-payload (JSON mode) request.
    #[must_use]
    pub fn with_payload(operation: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            raw_payload: Some(payload.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The raw payload, if one was supplied and is non-empty.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.raw_payload.as_deref().filter(|p| !p.is_empty())
    }
}

/// The outcome of a dispatched call.
///
/// `returns` holds the callable's regular return values; `error` holds either
/// the callable's own reported failure or, for failure responses built by a
/// transport, the dispatch error message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultEnvelope {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none", default)]
    pub returns: Option<Vec<Value>>,
    #[serde(rename = "e", skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ResultEnvelope {
    /// Failure response with only `e` populated.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_short_wire_names() {
        let req: RequestEnvelope =
            serde_json::from_str(r#"{"id":"7","fn":"echo","p":["hi", 2]}"#).unwrap();
        assert_eq!(req.id.as_deref(), Some("7"));
        assert_eq!(req.operation, "echo");
        assert_eq!(
            req.params,
            vec![Value::Text("hi".into()), Value::Number(2.0)]
        );
        assert!(req.raw_payload.is_none());
    }

    #[test]
    fn request_accepts_missing_or_null_params() {
        let req: RequestEnvelope = serde_json::from_str(r#"{"fn":"ping"}"#).unwrap();
        assert!(req.params.is_empty());

        let req: RequestEnvelope = serde_json::from_str(r#"{"fn":"ping","p":null}"#).unwrap();
        assert!(req.params.is_empty());
    }

    #[test]
    fn request_without_fn_is_rejected() {
        let result = serde_json::from_str::<RequestEnvelope>(r#"{"p":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_payload_counts_as_absent() {
        let req = RequestEnvelope::with_payload("op", "");
        assert!(req.payload().is_none());

        let req = RequestEnvelope::with_payload("op", "{}");
        assert_eq!(req.payload(), Some("{}"));
    }

    #[test]
    fn result_omits_absent_fields() {
        let result = ResultEnvelope {
            id: None,
            returns: Some(vec![Value::Text("hi".into())]),
            error: None,
        };
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"r":["hi"]}"#);
    }

    #[test]
    fn failure_populates_only_error() {
        let result = ResultEnvelope::failure("boom");
        assert!(result.is_failure());
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"e":"boom"}"#);
    }
}

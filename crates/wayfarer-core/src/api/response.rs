use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;

/// What a successful call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON with any `{"data": ...}` envelope already removed.
    Json(Value),
    /// The body was not JSON; handed back as text.
    Raw(String),
}

impl Payload {
    /// Parse a successful response body.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Payload::Json(unwrap_envelope(value)),
            Err(_) => Payload::Raw(String::from_utf8_lossy(body).into_owned()),
        }
    }

    /// Raw text becomes a JSON string, an empty body becomes `null`.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Raw(text) if text.trim().is_empty() => Value::Null,
            Payload::Raw(text) => Value::String(text),
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.into_json())
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// `{"data": x}` yields `x`; any other value is returned as is.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_is_unwrapped() {
        let payload = Payload::from_body(br#"{"data":{"id":1,"name":"x"}}"#);
        assert_eq!(payload, Payload::Json(json!({"id": 1, "name": "x"})));
    }

    #[test]
    fn test_bare_object_returned_verbatim() {
        let payload = Payload::from_body(br#"{"id":1,"name":"x"}"#);
        assert_eq!(payload, Payload::Json(json!({"id": 1, "name": "x"})));
    }

    #[test]
    fn test_null_data_field_is_still_unwrapped() {
        let payload = Payload::from_body(br#"{"data":null,"message":"ok"}"#);
        assert_eq!(payload, Payload::Json(Value::Null));
    }

    #[test]
    fn test_arrays_and_scalars_untouched() {
        assert_eq!(Payload::from_body(b"[1,2]"), Payload::Json(json!([1, 2])));
        assert_eq!(Payload::from_body(b"7"), Payload::Json(json!(7)));
    }

    #[test]
    fn test_non_json_body_is_raw() {
        let payload = Payload::from_body(b"created");
        assert_eq!(payload, Payload::Raw("created".to_string()));
        assert_eq!(payload.into_json(), json!("created"));
        assert_eq!(Payload::from_body(b"").into_json(), Value::Null);
    }

    #[test]
    fn test_decode_reports_shape_mismatch() {
        let err = Payload::Json(json!("text")).decode::<Vec<u32>>().unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}

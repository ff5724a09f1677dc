//! Body capture for request and response payloads.
//!
//! A body is stored as parsed JSON when it is JSON, and as a base64 string
//! otherwise. Parse failure is a normal outcome, not an error.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use moesif_api::TransferEncoding;
use serde_json::Value;

/// A body ready to be placed on a record.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBody {
    pub body: Value,
    pub transfer_encoding: Option<TransferEncoding>,
}

impl DecodedBody {
    fn json(body: Value) -> Self {
        Self {
            body,
            transfer_encoding: None,
        }
    }

    fn base64(body: String) -> Self {
        Self {
            body: Value::String(body),
            transfer_encoding: Some(TransferEncoding::Base64),
        }
    }
}

/// Decodes a body taken from an event or handler result.
///
/// - Structured values (objects, arrays, numbers, booleans) are kept as-is.
/// - Strings are parsed as JSON; on failure their UTF-8 bytes are base64 encoded.
/// - `null` and the empty string are returned unchanged.
pub fn decode_body(raw: &Value) -> DecodedBody {
    match raw {
        Value::String(text) if !text.is_empty() => match serde_json::from_str(text) {
            Ok(parsed) => DecodedBody::json(parsed),
            Err(_) => DecodedBody::base64(STANDARD.encode(text.as_bytes())),
        },
        other => DecodedBody::json(other.clone()),
    }
}

/// Captures a body, honouring the platform's `isBase64Encoded` flag.
///
/// Returns `None` when there is nothing to capture.
pub(crate) fn capture_body(raw: Option<&Value>, is_base64_encoded: bool) -> Option<DecodedBody> {
    let raw = raw.filter(|v| is_present(v))?;

    if is_base64_encoded {
        return Some(DecodedBody {
            body: raw.clone(),
            transfer_encoding: Some(TransferEncoding::Base64),
        });
    }

    Some(decode_body(raw))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_text_round_trips_to_structured_value() {
        let original = json!({"name": "widget", "tags": ["a", "b"], "count": 3});
        let decoded = decode_body(&Value::String(original.to_string()));

        assert_eq!(decoded.body, original);
        assert_eq!(decoded.transfer_encoding, None);
    }

    #[test]
    fn test_non_json_text_becomes_base64() {
        let decoded = decode_body(&json!("<html>hi</html>"));

        assert_eq!(decoded.body, json!("PGh0bWw+aGk8L2h0bWw+"));
        assert_eq!(decoded.transfer_encoding, Some(TransferEncoding::Base64));
    }

    #[test]
    fn test_structured_value_passes_through() {
        let value = json!([1, 2, 3]);
        let decoded = decode_body(&value);

        assert_eq!(decoded.body, value);
        assert_eq!(decoded.transfer_encoding, None);
    }

    #[test]
    fn test_empty_input_unchanged() {
        assert_eq!(decode_body(&json!("")).body, json!(""));
        assert_eq!(decode_body(&Value::Null).body, Value::Null);
    }

    #[test]
    fn test_capture_respects_base64_flag() {
        let raw = json!("eyJ0ZXN0IjoiYm9keSJ9");
        let captured = capture_body(Some(&raw), true).unwrap();

        assert_eq!(captured.body, raw);
        assert_eq!(captured.transfer_encoding, Some(TransferEncoding::Base64));
    }

    #[test]
    fn test_capture_skips_absent_bodies() {
        assert!(capture_body(None, false).is_none());
        assert!(capture_body(Some(&Value::Null), false).is_none());
        assert!(capture_body(Some(&json!("")), true).is_none());
    }
}

//! Persisted envelope format.
//!
//! Every key holds one JSON object: `{"v": <value>, "e": <expiry ms>}` where
//! `e` is omitted when the value never expires.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The value+expiry record stored under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Caller's value.
    #[serde(rename = "v")]
    pub value: Value,
    /// Absolute expiry in milliseconds since the epoch.
    #[serde(
        rename = "e",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "expiry_millis"
    )]
    pub expiry: Option<i64>,
}

impl Envelope {
    pub fn new(value: Value, expiry: Option<i64>) -> Self {
        Self { value, expiry }
    }

    /// True once `now` strictly exceeds the expiry. Never true without one.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiry.is_some_and(|expiry| now > expiry)
    }

    /// Encodes to the wire form.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes the wire form; anything that isn't an envelope is `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Accepts integer or fractional millisecond timestamps.
///
/// Flooring a fractional expiry keeps `now > expiry` exact for integer `now`.
#[allow(clippy::cast_possible_truncation)]
fn expiry_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number: Option<serde_json::Number> = Option::deserialize(deserializer)?;
    Ok(number.and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_wire_format_with_expiry() {
        let envelope = Envelope::new(json!("abc"), Some(1_700_000_000_123));
        assert_eq!(envelope.encode().unwrap(), r#"{"v":"abc","e":1700000000123}"#);
    }

    #[test]
    fn test_wire_format_without_expiry() {
        let envelope = Envelope::new(json!({"id": 1}), None);
        assert_eq!(envelope.encode().unwrap(), r#"{"v":{"id":1}}"#);
    }

    #[test]
    fn test_decode_fractional_expiry() {
        let envelope = Envelope::decode(r#"{"v":1,"e":1000.5}"#).unwrap();
        assert_eq!(envelope.expiry, Some(1000));
        assert!(!envelope.is_expired_at(1000));
        assert!(envelope.is_expired_at(1001));
    }

    #[test]
    fn test_decode_null_expiry_never_expires() {
        let envelope = Envelope::decode(r#"{"v":true,"e":null}"#).unwrap();
        assert_eq!(envelope.expiry, None);
        assert!(!envelope.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Envelope::decode("not json").is_none());
        assert!(Envelope::decode(r#""bare string""#).is_none());
        assert!(Envelope::decode(r#"{"e":5}"#).is_none());
        assert!(Envelope::decode(r#"{"v":1,"e":"soon"}"#).is_none());
    }

    #[test]
    fn test_expiry_is_strict() {
        let envelope = Envelope::new(json!(1), Some(500));
        assert!(!envelope.is_expired_at(499));
        assert!(!envelope.is_expired_at(500));
        assert!(envelope.is_expired_at(501));
    }

    proptest! {
        /// An envelope without expiry never reports expired.
        #[test]
        fn no_expiry_never_expires(now in any::<i64>(), n in any::<i64>()) {
            let envelope = Envelope::new(json!(n), None);
            prop_assert!(!envelope.is_expired_at(now));
        }

        /// Decoding what was encoded yields the same envelope.
        #[test]
        fn encoded_envelope_decodes(text in ".{0,32}", expiry in proptest::option::of(0i64..i64::MAX)) {
            let envelope = Envelope::new(json!(text), expiry);
            let raw = envelope.encode().unwrap();
            prop_assert_eq!(Envelope::decode(&raw), Some(envelope));
        }
    }
}

//! Inbound message envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message envelope carried by every inbound frame.
///
/// ```
/// use brain_channel::Envelope;
///
/// let env = Envelope::parse(r#"{"type":"ticker","data":{"price":1.5},"timestamp":1700000000000}"#).unwrap();
/// assert_eq!(env.kind, "ticker");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminator selecting the shape of `data`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Payload; shape depends on `kind`.
    #[serde(default)]
    pub data: Value,

    /// Emission time, milliseconds since the epoch.
    pub timestamp: f64,
}

impl Envelope {
    /// Creates an envelope stamped with the current time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: chrono::Utc::now().timestamp_millis() as f64,
        }
    }

    /// Parses a text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parses a binary frame holding UTF-8 JSON.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Deserializes the payload into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }

    /// Returns true if this envelope has the given type.
    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_envelope() {
        let env = Envelope::parse(
            r#"{"type":"trade","data":{"price":"101.5","size":2},"timestamp":1700000000123.0}"#,
        )
        .unwrap();

        assert!(env.is("trade"));
        assert_eq!(env.data["size"], json!(2));
        assert!((env.timestamp - 1_700_000_000_123.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let env = Envelope::parse(r#"{"type":"heartbeat","timestamp":1}"#).unwrap();
        assert_eq!(env.data, Value::Null);
    }

    #[test]
    fn test_malformed_frames_rejected() {
        assert!(Envelope::parse("not json").is_err());
        assert!(Envelope::parse(r#"{"data":{},"timestamp":1}"#).is_err());
        assert!(Envelope::parse(r#"{"type":"ticker","data":{}}"#).is_err());
        assert!(Envelope::parse(r#"[1,2,3]"#).is_err());
        assert!(Envelope::parse_bytes(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_data_as_typed() {
        #[derive(Deserialize)]
        struct Ticker {
            symbol: String,
            price: f64,
        }

        let env = Envelope::new("ticker", json!({"symbol": "BTC-USD", "price": 42.0}));
        let ticker: Ticker = env.data_as().unwrap();
        assert_eq!(ticker.symbol, "BTC-USD");
        assert!((ticker.price - 42.0).abs() < f64::EPSILON);
        assert!(env.timestamp > 0.0);
    }
}

//! Codec for encoding and decoding Relay envelopes.
//!
//! Envelopes are plain JSON objects, one per transport frame. The transport
//! delimits frames, so no length prefix is needed here.

use bytes::Bytes;
use thiserror::Error;

use crate::envelope::Envelope;

/// Maximum envelope size (1 MiB).
pub const MAX_ENVELOPE_SIZE: usize = 1024 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Envelope exceeds maximum size.
    #[error("Envelope size {0} exceeds maximum {MAX_ENVELOPE_SIZE}")]
    EnvelopeTooLarge(usize),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode an envelope to JSON bytes.
///
/// # Errors
///
/// Returns an error if the envelope is too large or serialization fails.
pub fn encode(envelope: &Envelope) -> Result<Bytes, ProtocolError> {
    let payload = serde_json::to_vec(envelope)?;

    if payload.len() > MAX_ENVELOPE_SIZE {
        return Err(ProtocolError::EnvelopeTooLarge(payload.len()));
    }

    Ok(Bytes::from(payload))
}

/// Decode an envelope from JSON bytes.
///
/// # Errors
///
/// Returns an error if the data is too large or is not a valid envelope.
pub fn decode(data: &[u8]) -> Result<Envelope, ProtocolError> {
    if data.len() > MAX_ENVELOPE_SIZE {
        return Err(ProtocolError::EnvelopeTooLarge(data.len()));
    }

    let envelope = serde_json::from_slice(data)?;
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Action;

    #[test]
    fn test_encode_decode_roundtrip() {
        let envelopes = vec![
            Envelope::subscribe("room1"),
            Envelope::publish("chat:lobby", r#""Hello, world!""#).unwrap(),
            Envelope::publish("t", r#"{"nested":{"key":[1,2,3]}}"#).unwrap(),
        ];

        for envelope in envelopes {
            let encoded = encode(&envelope).unwrap();
            let decoded = decode(&encoded).unwrap();
            assert_eq!(envelope.topic, decoded.topic);
            assert_eq!(envelope.action, decoded.action);
            assert_eq!(envelope.payload(), decoded.payload());
        }
    }

    #[test]
    fn test_decode_wire_shapes() {
        let decoded =
            decode(br#"{"topic":"room1","action":"subscribe","message":null}"#).unwrap();
        assert_eq!(decoded.topic, "room1");
        assert_eq!(decoded.action, Action::Subscribe);
        assert!(!decoded.has_payload());

        let decoded = decode(br#"{"topic":"room1","action":"publish","message":"hello"}"#).unwrap();
        assert_eq!(decoded.action, Action::Publish);
        assert_eq!(&decoded.payload()[..], br#""hello""#);

        // Missing message field is a publish with an empty payload.
        let decoded = decode(br#"{"topic":"room1","action":"publish"}"#).unwrap();
        assert!(decoded.payload().is_empty());
    }

    #[test]
    fn test_decode_unknown_action() {
        let decoded = decode(br#"{"topic":"t","action":"unsubscribe","message":null}"#).unwrap();
        assert_eq!(decoded.action, Action::Unknown);
    }

    #[test]
    fn test_decode_empty_topic_is_valid() {
        let decoded = decode(br#"{"topic":"","action":"subscribe"}"#).unwrap();
        assert_eq!(decoded.topic, "");
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode(b"not json at all").is_err());
        assert!(decode(br#"{"unrelated":"frame"}"#).is_err());
        assert!(decode(br#"{"topic":"t"}"#).is_err());
        assert!(decode(b"").is_err());
    }

    #[test]
    fn test_decode_too_large() {
        let mut data = Vec::with_capacity(MAX_ENVELOPE_SIZE + 64);
        data.extend_from_slice(br#"{"topic":"t","action":"publish","message":""#);
        data.resize(MAX_ENVELOPE_SIZE + 1, b'a');

        match decode(&data) {
            Err(ProtocolError::EnvelopeTooLarge(_)) => {}
            other => panic!("Expected EnvelopeTooLarge error, got {:?}", other),
        }
    }
}

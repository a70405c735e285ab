//! Envelope types for the Relay wire protocol.
//!
//! An envelope is the unit a client sends over its connection: a topic, an
//! action, and an opaque payload that subscribers receive verbatim.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::codec::ProtocolError;

/// Action requested by an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Fan the payload out to the topic's current subscribers.
    Publish,
    /// Add the sender to the topic's subscriber set.
    Subscribe,
    /// Any action value this server does not handle. Ignored on receipt.
    #[serde(other)]
    Unknown,
}

/// An inbound wire envelope.
///
/// ```json
/// {"topic": "room1", "action": "publish", "message": {"text": "hi"}}
/// ```
///
/// The payload stays a raw JSON value end to end, so subscribers receive the
/// publisher's exact bytes — whitespace and key order included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Target topic. Opaque and case-sensitive; the empty string is a valid
    /// topic.
    pub topic: String,

    /// Requested action.
    pub action: Action,

    /// Opaque payload, typically JSON. A missing field and an explicit
    /// `null` both mean "no payload".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Box<RawValue>>,
}

impl Envelope {
    /// Create a subscribe envelope for `topic`.
    #[must_use]
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            action: Action::Subscribe,
            message: None,
        }
    }

    /// Create a publish envelope carrying `payload`, which must be valid JSON
    /// text.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` is not valid JSON.
    pub fn publish(
        topic: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let message = RawValue::from_string(payload.into())?;
        Ok(Self {
            topic: topic.into(),
            action: Action::Publish,
            message: Some(message),
        })
    }

    /// The payload bytes subscribers receive: the raw `message` JSON text,
    /// or empty when the envelope carried none.
    #[must_use]
    pub fn payload(&self) -> Bytes {
        match &self.message {
            Some(raw) => Bytes::copy_from_slice(raw.get().as_bytes()),
            None => Bytes::new(),
        }
    }

    /// Whether the envelope carries a payload.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.message.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_envelope() {
        let envelope = Envelope::subscribe("room1");
        assert_eq!(envelope.topic, "room1");
        assert_eq!(envelope.action, Action::Subscribe);
        assert!(!envelope.has_payload());
        assert!(envelope.payload().is_empty());
    }

    #[test]
    fn test_publish_envelope() {
        let envelope = Envelope::publish("room1", r#"{"text":"hi"}"#).unwrap();
        assert_eq!(envelope.action, Action::Publish);
        assert_eq!(&envelope.payload()[..], br#"{"text":"hi"}"#);
    }

    #[test]
    fn test_publish_rejects_invalid_json() {
        assert!(Envelope::publish("room1", "not json").is_err());
    }

    #[test]
    fn test_payload_preserved_verbatim() {
        // Key order and whitespace must survive the round trip untouched.
        let payload = r#"{ "b": 1,  "a": [2, 3] }"#;
        let envelope = Envelope::publish("t", payload).unwrap();
        assert_eq!(&envelope.payload()[..], payload.as_bytes());
    }
}

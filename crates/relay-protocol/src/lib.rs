//! # relay-protocol
//!
//! Wire protocol definitions for the Relay broadcast server.
//!
//! This crate defines the JSON envelope exchanged between clients and the
//! server. Every inbound frame is one envelope:
//!
//! ```json
//! {"topic": "room1", "action": "publish", "message": {"text": "hi"}}
//! ```
//!
//! Outbound delivery carries only the raw `message` bytes — subscribers never
//! see the enclosing envelope.
//!
//! ## Example
//!
//! ```rust
//! use relay_protocol::{codec, Envelope};
//!
//! let envelope = Envelope::publish("chat:lobby", r#""Hello, world!""#).unwrap();
//!
//! let encoded = codec::encode(&envelope).unwrap();
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(decoded.payload(), envelope.payload());
//! ```

pub mod codec;
pub mod envelope;

pub use codec::{decode, encode, ProtocolError, MAX_ENVELOPE_SIZE};
pub use envelope::{Action, Envelope};

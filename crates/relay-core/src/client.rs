//! Client identity and send capability.
//!
//! A client is one connected peer: an id that is unique for the lifetime of
//! its connection, plus the capability to push bytes toward its transport.

use bytes::Bytes;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::mpsc;

/// Atomic counter so two connects in the same nanosecond still get distinct ids.
static CLIENT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a connected client.
///
/// Identity is immutable after creation; a reconnecting peer gets a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Create a client ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh unique client ID.
    #[must_use]
    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64;
        let counter = CLIENT_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("client_{timestamp:x}_{counter:x}"))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Why a send to a client failed. Every variant is terminal for the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The client's outbound queue is full. A peer that cannot drain its
    /// queue is treated the same as a disconnected one.
    #[error("outbound queue full")]
    Backlogged,

    /// The connection side of the queue is gone.
    #[error("connection closed")]
    Closed,
}

/// Send capability for one connected client.
///
/// Delivery hands the payload to the client's bounded outbound queue; the
/// connection's writer half drains the queue onto the transport. No caller
/// ever blocks on a peer's socket.
#[derive(Debug, Clone)]
pub struct ClientSender {
    tx: mpsc::Sender<Bytes>,
}

impl ClientSender {
    /// Queue `payload` for delivery to the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is full or the connection is gone.
    pub fn send(&self, payload: Bytes) -> Result<(), SendError> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Backlogged,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Whether the receiving half has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a client's outbound queue, drained by its writer task.
pub type OutboundReceiver = mpsc::Receiver<Bytes>;

/// Create a linked sender/receiver pair with the given queue capacity.
pub(crate) fn outbound_channel(capacity: usize) -> (ClientSender, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (ClientSender { tx }, rx)
}

/// A connected client: immutable identity plus its send capability.
#[derive(Debug, Clone)]
pub struct Client {
    id: ClientId,
    sender: ClientSender,
}

impl Client {
    pub(crate) fn new(id: ClientId, sender: ClientSender) -> Self {
        Self { id, sender }
    }

    /// The client's id.
    #[must_use]
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// The client's send capability.
    #[must_use]
    pub fn sender(&self) -> &ClientSender {
        &self.sender
    }

    /// Queue `payload` for delivery to this client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is unreachable.
    pub fn send(&self, payload: Bytes) -> Result<(), SendError> {
        self.sender.send(payload)
    }
}

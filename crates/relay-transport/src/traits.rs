//! Transport abstraction traits for Relay.
//!
//! A transport gives the hub, per client: a stream of inbound byte frames, a
//! way to push outbound bytes, and a closure signal. Nothing above this layer
//! parses transport framing, and nothing below it parses envelopes.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Inbound frame exceeds the configured size limit.
    #[error("Frame size {0} exceeds limit")]
    FrameTooLarge(usize),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// A transport that can accept connections.
///
/// Transports own the underlying protocol (WebSocket handshake, framing) and
/// hand the rest of the system an opaque bidirectional byte-message channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accept a new connection.
    ///
    /// This method blocks until a new connection is available or an error occurs.
    async fn accept(&self) -> Result<Box<dyn Connection>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// An active connection over a transport.
///
/// Methods take `&self` so one task can drive `recv` and `send` from the two
/// arms of a select loop.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Receive the next inbound frame.
    ///
    /// Returns `None` if the connection closed cleanly.
    async fn recv(&self) -> Result<Option<Bytes>, TransportError>;

    /// Send raw bytes to the peer as one frame.
    async fn send(&self, payload: Bytes) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;

    /// Get the remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}

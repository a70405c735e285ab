//! # relay-transport
//!
//! Transport abstraction layer for the Relay broadcast server.
//!
//! All transports implement the [`Transport`] and [`Connection`] traits,
//! presenting each client as an opaque bidirectional byte-message channel:
//! a stream of inbound frames, a send operation, and a closure signal.
//!
//! ```rust,ignore
//! use relay_transport::{Connection, Transport};
//!
//! async fn handle_connection(conn: Box<dyn Connection>) {
//!     while let Ok(Some(frame)) = conn.recv().await {
//!         // Feed the frame to the dispatcher
//!     }
//! }
//! ```

pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{Connection, Transport, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketTransport};

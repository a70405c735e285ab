//! # relay-core
//!
//! Subscription registry, hub, and broadcast fan-out for the Relay server.
//!
//! This crate is the pub/sub core:
//!
//! - **Client** - identity plus the send capability to one connected peer
//! - **Registry** - topic → subscriber set, the single source of truth for routing
//! - **Hub** - owns the client set and registry; everything else talks to it
//! - **dispatch** - routes one inbound envelope to subscribe or publish
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connection │────▶│  Dispatcher │────▶│     Hub     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │  Registry   │
//!                                         └─────────────┘
//! ```
//!
//! Transports feed raw frames into [`dispatch`]; the hub fans published
//! payloads back out through each subscriber's send capability.

pub mod client;
pub mod dispatch;
pub mod hub;
pub mod registry;

pub use client::{Client, ClientId, ClientSender, OutboundReceiver, SendError};
pub use dispatch::{dispatch, Dispatch};
pub use hub::{Hub, HubConfig, HubStats};
pub use registry::{Registry, Topic};

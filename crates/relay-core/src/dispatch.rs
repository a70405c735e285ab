//! Inbound frame dispatch.
//!
//! One awaiting-envelope state: each inbound frame either subscribes its
//! sender, publishes to a topic, or is dropped. Nothing here replies to the
//! sender and nothing escalates to a connection error.

use crate::client::ClientId;
use crate::hub::Hub;
use relay_protocol::{codec, Action};
use tracing::trace;

/// What the dispatcher did with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Sender added to the topic's subscriber set (or already in it).
    Subscribed {
        /// The topic subscribed to.
        topic: String,
    },

    /// Payload fanned out to the topic's subscribers.
    Published {
        /// The topic published to.
        topic: String,
        /// How many subscribers the payload was queued for.
        recipients: usize,
    },

    /// Envelope carried an action this server does not handle.
    Ignored,

    /// Frame was not a relay envelope. The channel also carries non-pubsub
    /// traffic, so the frame is dropped without a reply.
    Malformed,
}

/// Decode one inbound frame from `client` and route it.
///
/// Never fails: malformed frames and unknown actions are absorbed here, the
/// connection stays open, and the registry is left untouched by them.
pub fn dispatch(hub: &Hub, client: &ClientId, frame: &[u8]) -> Dispatch {
    let envelope = match codec::decode(frame) {
        Ok(envelope) => envelope,
        Err(err) => {
            trace!(client = %client, error = %err, "dropping non-envelope frame");
            return Dispatch::Malformed;
        }
    };

    match envelope.action {
        Action::Subscribe => {
            hub.subscribe(&envelope.topic, client);
            Dispatch::Subscribed {
                topic: envelope.topic,
            }
        }
        Action::Publish => {
            // The publisher is not excluded from its own publish: a publisher
            // subscribed to the topic hears itself.
            let recipients = hub.publish(&envelope.topic, envelope.payload(), None);
            Dispatch::Published {
                topic: envelope.topic,
                recipients,
            }
        }
        Action::Unknown => {
            trace!(client = %client, topic = %envelope.topic, "ignoring unknown action");
            Dispatch::Ignored
        }
    }
}

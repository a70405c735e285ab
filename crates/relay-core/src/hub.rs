//! The hub: client set, subscription registry, and broadcast fan-out.
//!
//! A `Hub` is constructed once at process start and handed by reference to
//! every connection task. There is no process-wide singleton; tests run as
//! many independent hubs as they like.

use crate::client::{outbound_channel, Client, ClientId, OutboundReceiver};
use crate::registry::Registry;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, trace, warn};

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each client's outbound queue. A subscriber whose queue
    /// fills up is treated as unreachable and evicted.
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 64,
        }
    }
}

/// Owns the connected-client set and the subscription registry.
///
/// Everything outside this crate talks to the hub: connections register here,
/// the dispatcher subscribes and publishes through it, and disconnects are
/// reported to it.
pub struct Hub {
    /// Connected clients by id.
    clients: DashMap<ClientId, Client>,
    /// Topic → subscriber routing.
    registry: Registry,
    /// Configuration.
    config: HubConfig,
}

impl Hub {
    /// Create a hub with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration.
    #[must_use]
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            clients: DashMap::new(),
            registry: Registry::new(),
            config,
        }
    }

    /// Register a new connection.
    ///
    /// Mints a fresh unique client id and returns it together with the
    /// receiving half of the client's outbound queue, which the connection's
    /// writer half drains onto its transport.
    pub fn connect(&self) -> (ClientId, OutboundReceiver) {
        let id = ClientId::generate();
        let receiver = self.attach(id.clone());
        (id, receiver)
    }

    /// Register a connection under a caller-chosen id.
    ///
    /// A client already registered under `id` is replaced; its old outbound
    /// queue closes, which its writer half observes as a disconnect.
    pub fn attach(&self, id: ClientId) -> OutboundReceiver {
        let (sender, receiver) = outbound_channel(self.config.outbound_capacity);
        self.clients.insert(id.clone(), Client::new(id.clone(), sender));
        debug!(client = %id, "client connected");
        receiver
    }

    /// Drop `id` and all of its subscriptions.
    ///
    /// Called when the transport signals closure or after a terminal send
    /// failure. No subscription may outlive its client.
    pub fn disconnect(&self, id: &ClientId) {
        self.clients.remove(id);
        let dropped = self.registry.remove_client(id);
        debug!(client = %id, subscriptions = dropped, "client disconnected");
    }

    /// Subscribe `id` to `topic`. Idempotent; no acknowledgement.
    ///
    /// Returns `true` when the subscription was newly created.
    pub fn subscribe(&self, topic: &str, id: &ClientId) -> bool {
        if !self.clients.contains_key(id) {
            warn!(client = %id, topic = %topic, "subscribe from unknown client");
            return false;
        }
        self.registry.subscribe(topic, id)
    }

    /// Unsubscribe `id` from `topic`.
    pub fn unsubscribe(&self, topic: &str, id: &ClientId) -> bool {
        self.registry.unsubscribe(topic, id)
    }

    /// Fan `payload` out to every current subscriber of `topic`, skipping
    /// `exclude` when given.
    ///
    /// The subscriber set is snapshotted first and every send happens outside
    /// the registry locks, so one slow peer cannot stall anyone else. Each
    /// send is independent: a failure evicts that client and delivery to the
    /// rest continues. Returns the number of subscribers the payload was
    /// queued for.
    pub fn publish(&self, topic: &str, payload: Bytes, exclude: Option<&ClientId>) -> usize {
        let subscribers = self.registry.subscribers_of(topic);
        if subscribers.is_empty() {
            trace!(topic = %topic, "publish to topic with no subscribers");
            return 0;
        }

        let mut delivered = 0;
        let mut dead = Vec::new();

        for id in subscribers {
            if exclude.is_some_and(|ex| *ex == id) {
                continue;
            }

            // Clone the send capability out of the map so the send itself
            // runs without holding any shard lock.
            let sender = match self.clients.get(&id) {
                Some(client) => client.sender().clone(),
                None => {
                    // Registry lagged behind a disconnect; prune it.
                    dead.push(id);
                    continue;
                }
            };

            match sender.send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(client = %id, error = %err, "send failed, evicting client");
                    dead.push(id);
                }
            }
        }

        for id in &dead {
            self.disconnect(id);
        }

        trace!(topic = %topic, recipients = delivered, "published");
        delivered
    }

    /// Whether `id` is currently connected.
    #[must_use]
    pub fn is_connected(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    /// The hub's subscription registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get hub statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            client_count: self.clients.len(),
            topic_count: self.registry.topic_count(),
            subscription_count: self.registry.subscription_count(),
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Hub statistics.
#[derive(Debug, Clone)]
pub struct HubStats {
    /// Number of connected clients.
    pub client_count: usize,
    /// Number of topics with at least one subscriber.
    pub topic_count: usize,
    /// Total number of subscriptions.
    pub subscription_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[tokio::test]
    async fn test_fanout_to_all_subscribers() {
        let hub = Hub::new();
        let a = ClientId::new("a");
        let b = ClientId::new("b");
        let c = ClientId::new("c");
        let d = ClientId::new("d");

        let mut rx_a = hub.attach(a.clone());
        let mut rx_b = hub.attach(b.clone());
        let mut rx_c = hub.attach(c.clone());
        let mut rx_d = hub.attach(d.clone());

        hub.subscribe("t", &a);
        hub.subscribe("t", &b);
        hub.subscribe("t", &c);
        hub.subscribe("u", &d);

        let count = hub.publish("t", payload("P"), None);
        assert_eq!(count, 3);

        assert_eq!(rx_a.recv().await.unwrap(), payload("P"));
        assert_eq!(rx_b.recv().await.unwrap(), payload("P"));
        assert_eq!(rx_c.recv().await.unwrap(), payload("P"));
        // A client subscribed only to a different topic receives nothing.
        assert!(rx_d.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_with_exclusion() {
        let hub = Hub::new();
        let a = ClientId::new("a");
        let b = ClientId::new("b");

        let mut rx_a = hub.attach(a.clone());
        let mut rx_b = hub.attach(b.clone());

        hub.subscribe("t", &a);
        hub.subscribe("t", &b);

        let count = hub.publish("t", payload("P"), Some(&a));
        assert_eq!(count, 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.recv().await.unwrap(), payload("P"));
    }

    #[test]
    fn test_publish_no_subscribers_is_noop() {
        let hub = Hub::new();
        assert_eq!(hub.publish("empty", payload("P"), None), 0);
        assert_eq!(hub.stats().topic_count, 0);
    }

    #[tokio::test]
    async fn test_disconnect_stops_delivery() {
        let hub = Hub::new();
        let a = ClientId::new("a");
        let b = ClientId::new("b");

        let _rx_a = hub.attach(a.clone());
        let mut rx_b = hub.attach(b.clone());

        hub.subscribe("t", &a);
        hub.subscribe("t", &b);
        hub.disconnect(&a);

        assert!(!hub.is_connected(&a));
        assert!(hub.registry().subscribers_of("t").iter().all(|id| *id != a));

        let count = hub.publish("t", payload("P"), None);
        assert_eq!(count, 1);
        assert_eq!(rx_b.recv().await.unwrap(), payload("P"));
    }

    #[test]
    fn test_send_failure_evicts_client() {
        let hub = Hub::new();
        let a = ClientId::new("a");

        let rx = hub.attach(a.clone());
        hub.subscribe("t", &a);
        drop(rx); // peer gone, queue closed

        assert_eq!(hub.publish("t", payload("P"), None), 0);
        assert!(!hub.is_connected(&a));
        assert!(hub.registry().subscribers_of("t").is_empty());
    }

    #[test]
    fn test_backlogged_client_evicted() {
        let hub = Hub::with_config(HubConfig {
            outbound_capacity: 1,
        });
        let a = ClientId::new("a");

        let _rx = hub.attach(a.clone());
        hub.subscribe("t", &a);

        assert_eq!(hub.publish("t", payload("one"), None), 1);
        // Queue full and never drained: the second publish evicts the client.
        assert_eq!(hub.publish("t", payload("two"), None), 0);
        assert!(!hub.is_connected(&a));
    }

    #[test]
    fn test_subscribe_unknown_client_rejected() {
        let hub = Hub::new();
        let ghost = ClientId::new("ghost");
        assert!(!hub.subscribe("t", &ghost));
        assert_eq!(hub.stats().subscription_count, 0);
    }

    #[test]
    fn test_stats() {
        let hub = Hub::new();
        let a = ClientId::new("a");
        let b = ClientId::new("b");

        let _rx_a = hub.attach(a.clone());
        let _rx_b = hub.attach(b.clone());
        hub.subscribe("t1", &a);
        hub.subscribe("t2", &a);
        hub.subscribe("t1", &b);

        let stats = hub.stats();
        assert_eq!(stats.client_count, 2);
        assert_eq!(stats.topic_count, 2);
        assert_eq!(stats.subscription_count, 3);
    }
}

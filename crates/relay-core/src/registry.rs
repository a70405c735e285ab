//! Topic-indexed subscription registry.
//!
//! The registry is the single source of truth for routing: it maps each topic
//! to the set of client ids subscribed to it. A reverse index per client makes
//! disconnect cleanup proportional to that client's subscriptions.

use crate::client::ClientId;
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::debug;

/// A topic name. Opaque and case-sensitive, no hierarchy or wildcards; the
/// empty string is a valid topic.
pub type Topic = String;

/// Maps topic → set of subscribed client ids.
///
/// All operations are safe to call concurrently from many connection tasks.
/// Lock order is always client index before topic index, so the sharded maps
/// cannot deadlock against each other.
#[derive(Debug, Default)]
pub struct Registry {
    /// Topic → subscriber ids. Lookup key for the publish path.
    topics: DashMap<Topic, HashSet<ClientId>>,
    /// Client id → topics it is subscribed to, for disconnect cleanup.
    by_client: DashMap<ClientId, HashSet<Topic>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `client` to `topic`.
    ///
    /// Idempotent: at most one subscription exists per `(topic, client)`
    /// pair. Returns `true` only when the pair was newly inserted.
    pub fn subscribe(&self, topic: &str, client: &ClientId) -> bool {
        // Hold the client's entry while touching the topic index so a
        // concurrent remove_client cannot miss this subscription.
        let mut topics_of = self.by_client.entry(client.clone()).or_default();
        topics_of.insert(topic.to_string());

        let inserted = self
            .topics
            .entry(topic.to_string())
            .or_default()
            .insert(client.clone());

        if inserted {
            debug!(topic = %topic, client = %client, "subscribed");
        }
        inserted
    }

    /// Unsubscribe `client` from `topic`.
    ///
    /// Returns `true` if a subscription was removed.
    pub fn unsubscribe(&self, topic: &str, client: &ClientId) -> bool {
        {
            let Some(mut topics_of) = self.by_client.get_mut(client) else {
                return false;
            };
            if !topics_of.remove(topic) {
                return false;
            }
            // Still holding the client entry: same lock order as subscribe.
            self.drop_subscriber(topic, client);
        }

        self.by_client.remove_if(client, |_, topics| topics.is_empty());
        debug!(topic = %topic, client = %client, "unsubscribed");
        true
    }

    /// Remove every subscription held by `client`.
    ///
    /// Returns the number of subscriptions dropped.
    pub fn remove_client(&self, client: &ClientId) -> usize {
        let Some((_, topics_of)) = self.by_client.remove(client) else {
            return 0;
        };

        for topic in &topics_of {
            self.drop_subscriber(topic, client);
        }

        if !topics_of.is_empty() {
            debug!(client = %client, subscriptions = topics_of.len(), "removed client");
        }
        topics_of.len()
    }

    /// Snapshot of the current subscriber set for `topic`.
    ///
    /// The snapshot is consistent at call time; callers deliver against it
    /// without holding any registry lock.
    #[must_use]
    pub fn subscribers_of(&self, topic: &str) -> Vec<ClientId> {
        self.topics
            .get(topic)
            .map(|subs| subs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `client` is subscribed to `topic`.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str, client: &ClientId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|subs| subs.contains(client))
    }

    /// The topics `client` is subscribed to.
    #[must_use]
    pub fn topics_of(&self, client: &ClientId) -> Vec<Topic> {
        self.by_client
            .get(client)
            .map(|topics| topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of topics with at least one subscriber.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Total number of `(topic, client)` subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.topics.iter().map(|subs| subs.len()).sum()
    }

    /// Drop `client` from one topic's subscriber set, deleting the set when
    /// it empties.
    fn drop_subscriber(&self, topic: &str, client: &ClientId) {
        if let Some(mut subs) = self.topics.get_mut(topic) {
            subs.remove(client);
        }
        self.topics.remove_if(topic, |_, subs| subs.is_empty());
    }
}

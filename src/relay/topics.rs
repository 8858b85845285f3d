//! Topic-based publish/subscribe relaying.
//!
//! The topic index is process-wide, not room-scoped: topics are free-form
//! strings chosen by peers. By convention a room's peers subscribe to the
//! room's derived `room:<code>` topic plus any application-defined topics.
//! Payloads are opaque — the relay forwards them without interpretation.

use axum::extract::ws::Message;
use serde_json::{Map, Value};

use crate::rooms::store::RelayCore;
use crate::ws::ConnId;

impl RelayCore {
    /// Subscribe a connection to each topic, creating subscriber sets as
    /// needed. Silently ignored for connections with no associated peer
    /// (not yet authenticated).
    pub fn subscribe(&mut self, conn: ConnId, topics: &[String]) {
        let Some(peer) = self.peer_mut(conn) else {
            return;
        };
        for topic in topics {
            peer.topics.insert(topic.clone());
        }
        for topic in topics {
            self.topics.entry(topic.clone()).or_default().insert(conn);
            tracing::debug!(conn, topic = %topic, "subscribed");
        }
    }

    /// Symmetric removal; a subscriber set that empties is dropped from the
    /// index entirely.
    pub fn unsubscribe(&mut self, conn: ConnId, topics: &[String]) {
        let Some(peer) = self.peer_mut(conn) else {
            return;
        };
        for topic in topics {
            peer.topics.remove(topic);
        }
        for topic in topics {
            self.prune_subscriber(topic, conn);
            tracing::debug!(conn, topic = %topic, "unsubscribed");
        }
    }

    /// Relay a publish frame to every subscriber of `topic` except the sender.
    ///
    /// The inbound object is forwarded as-is with a `clients` field set to the
    /// subscriber-set size at publish time. That count includes the sender —
    /// long-standing protocol behavior that clients use to gauge room
    /// fullness, kept deliberately.
    pub fn publish(&self, from: ConnId, topic: &str, mut payload: Map<String, Value>) {
        let Some(subscribers) = self.topics.get(topic) else {
            // Nobody listening. Expected, not an error.
            tracing::debug!(topic = %topic, "publish to topic with no subscribers dropped");
            return;
        };

        payload.insert("clients".to_string(), Value::from(subscribers.len()));
        let text = match serde_json::to_string(&Value::Object(payload)) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "failed to serialize relayed publish");
                return;
            }
        };

        for &subscriber in subscribers {
            if subscriber == from {
                continue;
            }
            if let Some(sender) = self.sender_of(subscriber) {
                let _ = sender.send(Message::Text(text.clone().into()));
            }
        }
    }

    /// Drop every subscription held by a disconnecting connection, pruning
    /// emptied subscriber sets. Walks the peer's own subscription set rather
    /// than the whole index.
    pub fn cleanup_subscriptions(&mut self, conn: ConnId) {
        let Some(peer) = self.peer_mut(conn) else {
            return;
        };
        let topics = std::mem::take(&mut peer.topics);
        for topic in &topics {
            self.prune_subscriber(topic, conn);
        }
        if !topics.is_empty() {
            tracing::debug!(conn, count = topics.len(), "subscriptions cleaned up");
        }
    }

    /// Remove one connection from one topic's subscriber set, deleting the
    /// set if it becomes empty.
    fn prune_subscriber(&mut self, topic: &str, conn: ConnId) {
        let emptied = match self.topics.get_mut(topic) {
            Some(subscribers) => {
                subscribers.remove(&conn);
                subscribers.is_empty()
            }
            None => false,
        };
        if emptied {
            self.topics.remove(topic);
        }
    }
}

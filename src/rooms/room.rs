use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::task::JoinHandle;

use crate::ws::{ConnId, ConnectionSender};

/// A participant currently joined to exactly one room.
///
/// Owned by its `Room`; the reverse indices in `RelayCore` only hold the ids
/// needed to find it again.
#[derive(Debug)]
pub struct Peer {
    /// Opaque unique id, generated at join time
    pub id: String,
    /// Display name, 1-32 characters after trimming, not unique
    pub name: String,
    /// The connection this peer arrived on
    pub conn: ConnId,
    /// Outbound channel for this peer's connection
    pub sender: ConnectionSender,
    /// Topics this peer is currently subscribed to
    pub topics: HashSet<String>,
}

/// Roster entry exposed in `auth-ok` responses and room lookups.
#[derive(Debug, Clone, Serialize)]
pub struct PeerInfo {
    pub id: String,
    pub name: String,
}

/// An ephemeral, named collaboration session.
#[derive(Debug)]
pub struct Room {
    /// Short human-typable code, unique among live rooms
    pub code: String,
    /// peer id -> Peer
    pub peers: HashMap<String, Peer>,
    pub created_at: DateTime<Utc>,
    /// Pending destruction, armed only while `peers` is empty. Aborting an
    /// already-finished task is a no-op, so cancellation is idempotent.
    pub destroy_timer: Option<JoinHandle<()>>,
}

impl Room {
    pub fn new(code: String) -> Self {
        Self {
            code,
            peers: HashMap::new(),
            created_at: Utc::now(),
            destroy_timer: None,
        }
    }

    /// The implicit signaling topic every peer in this room shares.
    pub fn topic(&self) -> String {
        room_topic(&self.code)
    }

    /// Roster of every peer except `excluded`.
    pub fn roster_excluding(&self, excluded: &str) -> Vec<PeerInfo> {
        self.peers
            .values()
            .filter(|p| p.id != excluded)
            .map(|p| PeerInfo {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect()
    }

    /// Full roster.
    pub fn roster(&self) -> Vec<PeerInfo> {
        self.roster_excluding("")
    }
}

/// Derive the canonical room topic from a room code.
pub fn room_topic(code: &str) -> String {
    format!("room:{}", code)
}

use rand::Rng;
use std::collections::{HashMap, HashSet};

use crate::rooms::room::{Peer, Room};
use crate::ws::{ConnId, ConnectionSender};

/// Room code alphabet: uppercase letters and digits minus the visually
/// ambiguous glyphs I, O, 0, 1.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// All mutable relay state: rooms, the global topic subscription index, and
/// the two lookup-only reverse indices. One instance per process, guarded by
/// a single mutex (see `AppState`), so every mutation sequence is atomic with
/// respect to other connections.
///
/// Rooms own their peers; `conn_peers` and `peer_rooms` are kept in lockstep
/// with room mutations and never updated independently.
#[derive(Debug, Default)]
pub struct RelayCore {
    /// room code -> Room
    pub rooms: HashMap<String, Room>,
    /// topic -> subscribed connections. Invariant: no empty sets — the key is
    /// removed as soon as its last subscriber leaves.
    pub topics: HashMap<String, HashSet<ConnId>>,
    /// connection -> peer id (reverse index, lookup only)
    pub conn_peers: HashMap<ConnId, String>,
    /// peer id -> room code (reverse index, lookup only)
    pub peer_rooms: HashMap<String, String>,
}

impl RelayCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room under a freshly generated code and return the code.
    /// Collisions against live rooms are handled by regenerating; the 32^6
    /// keyspace makes more than a retry or two vanishingly unlikely.
    pub fn create_room(&mut self) -> &Room {
        let code = loop {
            let candidate = generate_code();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        tracing::info!(room = %code, "room created");
        self.rooms
            .entry(code.clone())
            .or_insert_with(|| Room::new(code))
    }

    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_exists(&self, code: &str) -> bool {
        self.rooms.contains_key(code)
    }

    /// Number of live rooms. Health-check support only.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Resolve a connection to its peer via the reverse indices.
    pub fn peer_by_conn(&self, conn: ConnId) -> Option<&Peer> {
        let peer_id = self.conn_peers.get(&conn)?;
        let code = self.peer_rooms.get(peer_id)?;
        self.rooms.get(code)?.peers.get(peer_id)
    }

    /// Resolve a connection to the outbound sender of its peer.
    pub fn sender_of(&self, conn: ConnId) -> Option<&ConnectionSender> {
        self.peer_by_conn(conn).map(|p| &p.sender)
    }

    /// Resolve a connection to `(room code, peer id)` without borrowing the peer.
    pub(crate) fn locate(&self, conn: ConnId) -> Option<(String, String)> {
        let peer_id = self.conn_peers.get(&conn)?;
        let code = self.peer_rooms.get(peer_id)?;
        Some((code.clone(), peer_id.clone()))
    }

    /// Mutable access to the peer behind a connection, if one is joined.
    pub(crate) fn peer_mut(&mut self, conn: ConnId) -> Option<&mut Peer> {
        let peer_id = self.conn_peers.get(&conn)?;
        let code = self.peer_rooms.get(peer_id)?;
        self.rooms.get_mut(code)?.peers.get_mut(peer_id)
    }
}

/// Generate a candidate room code from the fixed alphabet.
fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_fixed_length_and_alphabet() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            for byte in code.bytes() {
                assert!(
                    CODE_CHARSET.contains(&byte),
                    "unexpected character {:?} in code {}",
                    byte as char,
                    code
                );
            }
        }
    }

    #[test]
    fn codes_exclude_ambiguous_glyphs() {
        for glyph in [b'I', b'O', b'0', b'1'] {
            assert!(!CODE_CHARSET.contains(&glyph));
        }
    }

    #[test]
    fn create_room_never_reuses_a_live_code() {
        let mut core = RelayCore::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let code = core.create_room().code.clone();
            assert!(seen.insert(code), "duplicate code for a live room");
        }
        assert_eq!(core.room_count(), 500);
    }

    #[test]
    fn room_lookups() {
        let mut core = RelayCore::new();
        let code = core.create_room().code.clone();
        assert!(core.room_exists(&code));
        assert!(core.room(&code).is_some());
        assert!(!core.room_exists("NOSUCH"));
        assert!(core.room("NOSUCH").is_none());
        assert_eq!(core.room_count(), 1);
    }

    #[test]
    fn peer_resolution_via_reverse_indices() {
        let mut core = RelayCore::new();
        let _rx = test_support::join_test_peer(&mut core, "AAAAAA", "peer-1", 7);
        assert_eq!(core.peer_by_conn(7).map(|p| p.id.as_str()), Some("peer-1"));
        assert!(core.sender_of(7).is_some());
        assert_eq!(
            core.locate(7),
            Some(("AAAAAA".to_string(), "peer-1".to_string()))
        );
        assert!(core.peer_by_conn(8).is_none());
    }
}

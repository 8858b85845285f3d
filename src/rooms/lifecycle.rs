//! Peer join/leave orchestration: peer creation, join/leave broadcasts,
//! reverse-index upkeep, and delayed destruction of empty rooms.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::rooms::room::{Peer, PeerInfo, Room};
use crate::state::{lock_core, AppState};
use crate::ws::protocol::{self, ServerMessage};
use crate::ws::{ConnId, ConnectionSender};

#[derive(Debug, PartialEq, Eq)]
pub enum JoinError {
    RoomNotFound,
}

/// What the caller needs to answer the joiner: its fresh id, the room's
/// signaling topic, and the roster of peers that were already present.
#[derive(Debug)]
pub struct JoinOutcome {
    pub peer_id: String,
    pub room_topic: String,
    pub others: Vec<PeerInfo>,
}

/// Join a connection to a room as a new peer.
///
/// Cancels a pending destroy timer (rejoin within the grace period keeps the
/// room alive), broadcasts `peer-joined` to every peer already in the room,
/// and installs the peer in the room and both reverse indices in one atomic
/// mutation.
pub fn join_room(
    state: &AppState,
    code: &str,
    name: &str,
    conn: ConnId,
    sender: ConnectionSender,
) -> Result<JoinOutcome, JoinError> {
    let mut core = state.core();
    let Some(room) = core.rooms.get_mut(code) else {
        return Err(JoinError::RoomNotFound);
    };

    if let Some(timer) = room.destroy_timer.take() {
        timer.abort();
        tracing::debug!(room = %code, "pending destruction cancelled by join");
    }

    let peer_id = Uuid::new_v4().to_string();
    let others = room.roster();

    let joined = ServerMessage::PeerJoined {
        peer_id: peer_id.clone(),
        name: name.to_string(),
    };
    for peer in room.peers.values() {
        protocol::send(&peer.sender, &joined);
    }

    room.peers.insert(
        peer_id.clone(),
        Peer {
            id: peer_id.clone(),
            name: name.to_string(),
            conn,
            sender,
            topics: HashSet::new(),
        },
    );
    let room_topic = room.topic();

    core.conn_peers.insert(conn, peer_id.clone());
    core.peer_rooms.insert(peer_id.clone(), code.to_string());

    tracing::info!(room = %code, peer_id = %peer_id, name = %name, "peer joined");

    Ok(JoinOutcome {
        peer_id,
        room_topic,
        others,
    })
}

/// Remove whatever peer is associated with a connection, if any.
///
/// Purges the peer's topic subscriptions, removes it from its room and both
/// reverse indices, broadcasts `peer-left` to the remaining peers, and arms
/// the destroy timer if the room emptied. Safe to call for connections that
/// never authenticated or were already removed.
pub fn remove_peer(state: &AppState, conn: ConnId) {
    let mut core = state.core();
    let Some((code, peer_id)) = core.locate(conn) else {
        return;
    };

    core.cleanup_subscriptions(conn);
    core.conn_peers.remove(&conn);
    core.peer_rooms.remove(&peer_id);

    let Some(room) = core.rooms.get_mut(&code) else {
        return;
    };
    let Some(peer) = room.peers.remove(&peer_id) else {
        return;
    };

    let left = ServerMessage::PeerLeft {
        peer_id: peer.id,
        name: peer.name,
    };
    for other in room.peers.values() {
        protocol::send(&other.sender, &left);
    }

    tracing::info!(room = %code, peer_id = %peer_id, "peer left");

    if room.peers.is_empty() {
        arm_destroy_timer(state, room);
    }
}

/// Schedule destruction of a just-emptied room after the grace period.
///
/// The timer re-checks emptiness when it fires: the room may have been
/// repopulated (and possibly vacated again, arming a newer timer) between
/// scheduling and firing.
fn arm_destroy_timer(state: &AppState, room: &mut Room) {
    let core = Arc::clone(&state.core);
    let code = room.code.clone();
    let grace = state.room_grace_period;

    tracing::debug!(room = %code, grace_secs = grace.as_secs_f64(), "room empty, destruction scheduled");

    room.destroy_timer = Some(tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        let mut core = lock_core(&core);
        let still_empty = core
            .rooms
            .get(&code)
            .map(|r| r.peers.is_empty())
            .unwrap_or(false);
        if still_empty {
            core.rooms.remove(&code);
            tracing::info!(room = %code, "empty room destroyed after grace period");
        }
    }));
}

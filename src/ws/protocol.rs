//! JSON wire protocol: frame decoding, the authentication gate, and dispatch
//! to the room/topic relay operations.
//!
//! Every inbound frame must be a JSON object with a string `type` field;
//! anything else is dropped without a reply and the connection stays open.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rooms::lifecycle::{self, JoinError};
use crate::rooms::room::PeerInfo;
use crate::state::AppState;
use crate::ws::{ConnId, ConnectionSender};

/// Display names are capped at 32 characters after trimming.
const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Deserialize)]
struct AuthRequest {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "roomCode")]
    room_code: String,
}

#[derive(Debug, Deserialize)]
struct TopicsRequest {
    #[serde(default)]
    topics: Vec<String>,
}

/// Server -> client message shapes.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "auth-ok")]
    AuthOk {
        #[serde(rename = "roomTopic")]
        room_topic: String,
        peers: Vec<PeerInfo>,
    },
    #[serde(rename = "auth-error")]
    AuthError { reason: String },
    #[serde(rename = "peer-joined")]
    PeerJoined {
        #[serde(rename = "peerId")]
        peer_id: String,
        name: String,
    },
    #[serde(rename = "peer-left")]
    PeerLeft {
        #[serde(rename = "peerId")]
        peer_id: String,
        name: String,
    },
    #[serde(rename = "pong")]
    Pong,
}

/// Serialize and send a server message over a connection's outbound channel.
/// Send failures mean the connection is already closing; nothing to do.
pub fn send(tx: &ConnectionSender, msg: &ServerMessage) {
    if let Ok(text) = serde_json::to_string(msg) {
        let _ = tx.send(Message::Text(text.into()));
    }
}

/// Handle one inbound text frame.
///
/// `authenticated` is the connection's gate state, owned by the actor: false
/// until the first successful `auth`, after which it never resets.
pub fn handle_text_frame(
    text: &str,
    conn: ConnId,
    tx: &ConnectionSender,
    state: &AppState,
    authenticated: &mut bool,
) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(conn, error = %e, "malformed frame dropped");
            return;
        }
    };
    let Value::Object(payload) = value else {
        tracing::debug!(conn, "non-object frame dropped");
        return;
    };
    let Some(msg_type) = payload.get("type").and_then(Value::as_str) else {
        tracing::debug!(conn, "frame without string type dropped");
        return;
    };
    let msg_type = msg_type.to_string();

    // The gate: everything except auth is rejected until auth succeeds.
    // The connection stays open so the client can retry.
    if !*authenticated && msg_type != "auth" {
        send(
            tx,
            &ServerMessage::AuthError {
                reason: "Must authenticate first".to_string(),
            },
        );
        return;
    }

    match msg_type.as_str() {
        "auth" => {
            if *authenticated {
                // Second auth attempt on an authenticated connection
                tracing::debug!(conn, "duplicate auth ignored");
                return;
            }
            let req: AuthRequest = match serde_json::from_value(Value::Object(payload)) {
                Ok(req) => req,
                Err(e) => {
                    tracing::debug!(conn, error = %e, "unreadable auth frame dropped");
                    return;
                }
            };
            authenticate(state, conn, tx, &req.name, &req.room_code, authenticated);
        }
        "subscribe" => {
            if let Ok(req) = serde_json::from_value::<TopicsRequest>(Value::Object(payload)) {
                state.core().subscribe(conn, &req.topics);
            }
        }
        "unsubscribe" => {
            if let Ok(req) = serde_json::from_value::<TopicsRequest>(Value::Object(payload)) {
                state.core().unsubscribe(conn, &req.topics);
            }
        }
        "publish" => {
            let Some(topic) = payload.get("topic").and_then(Value::as_str).map(str::to_string)
            else {
                tracing::debug!(conn, "publish without topic dropped");
                return;
            };
            // The whole inbound object is relayed; extra fields pass through.
            state.core().publish(conn, &topic, payload);
        }
        "ping" => send(tx, &ServerMessage::Pong),
        other => {
            tracing::debug!(conn, msg_type = other, "unrecognized message type dropped");
        }
    }
}

/// Validate credentials and join the connection's peer to the requested room.
fn authenticate(
    state: &AppState,
    conn: ConnId,
    tx: &ConnectionSender,
    name: &str,
    room_code: &str,
    authenticated: &mut bool,
) {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        send(
            tx,
            &ServerMessage::AuthError {
                reason: "Name must be 1-32 characters".to_string(),
            },
        );
        return;
    }
    if room_code.is_empty() {
        send(
            tx,
            &ServerMessage::AuthError {
                reason: "Room code is required".to_string(),
            },
        );
        return;
    }

    match lifecycle::join_room(state, room_code, name, conn, tx.clone()) {
        Ok(outcome) => {
            *authenticated = true;
            send(
                tx,
                &ServerMessage::AuthOk {
                    room_topic: outcome.room_topic,
                    peers: outcome.others,
                },
            );
        }
        Err(JoinError::RoomNotFound) => {
            send(
                tx,
                &ServerMessage::AuthError {
                    reason: "Room not found".to_string(),
                },
            );
        }
    }
}

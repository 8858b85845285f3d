use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::rooms::room::PeerInfo;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub code: String,
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub code: String,
    pub topic: String,
    #[serde(rename = "peerCount")]
    pub peer_count: usize,
    pub peers: Vec<PeerInfo>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// POST /api/rooms — Create a room under a freshly generated code.
pub async fn create_room(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateRoomResponse>) {
    let mut core = state.core();
    let room = core.create_room();
    let response = CreateRoomResponse {
        code: room.code.clone(),
        topic: room.topic(),
    };
    (StatusCode::CREATED, Json(response))
}

/// GET /api/rooms/{code} — Look up a room and its current roster.
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomResponse>, (StatusCode, Json<serde_json::Value>)> {
    let core = state.core();
    match core.room(&code) {
        Some(room) => Ok(Json(RoomResponse {
            code: room.code.clone(),
            topic: room.topic(),
            peer_count: room.peers.len(),
            peers: room.roster(),
            created_at: room.created_at.to_rfc3339(),
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Room not found"})),
        )),
    }
}

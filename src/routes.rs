use axum::{extract::State, Json, Router};

use crate::rooms::routes as rooms;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes.
pub fn build_router(state: AppState) -> Router {
    // Room management surface (thin plumbing over the room store)
    let room_routes = Router::new()
        .route("/api/rooms", axum::routing::post(rooms::create_room))
        .route("/api/rooms/{code}", axum::routing::get(rooms::get_room));

    // WebSocket endpoint (auth happens in-band on the first frame)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(room_routes)
        .merge(ws_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint with the live room count
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let rooms = state.core().room_count();
    Json(serde_json::json!({"status": "ok", "rooms": rooms}))
}

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

use crate::rooms::lifecycle;
use crate::state::AppState;
use crate::ws::protocol;

/// Run the actor-per-connection pattern for an accepted WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: processes incoming frames, dispatches to protocol handlers
/// - Heartbeat task: sends a Ping each interval and terminates the connection
///   after one missed Pong
///
/// The mpsc channel allows any part of the system to push frames to this
/// client by cloning the sender; it is what the relay stores on the Peer.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let conn = state.next_conn_id();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    tracing::info!(conn, "connection accepted");

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Liveness flag, attached before auth: the reader sets it on every Pong,
    // the heartbeat task clears it each tick and kills the connection if it
    // was never set back.
    let alive = Arc::new(AtomicBool::new(true));
    let (dead_tx, mut dead_rx) = oneshot::channel::<()>();

    let probe_alive = alive.clone();
    let probe_tx = tx.clone();
    let heartbeat_interval = state.heartbeat_interval;
    let heartbeat_handle = tokio::spawn(async move {
        let mut timer = interval(heartbeat_interval);
        // Skip the first immediate tick
        timer.tick().await;
        loop {
            timer.tick().await;
            if !probe_alive.swap(false, Ordering::SeqCst) {
                tracing::warn!(conn, "liveness probe missed, terminating connection");
                let _ = probe_tx.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Liveness probe missed".into(),
                })));
                let _ = dead_tx.send(());
                break;
            }
            if probe_tx.send(Message::Ping(Vec::new().into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }
        }
    });

    // Gate state for this connection: false until the first successful auth
    let mut authenticated = false;

    // Reader loop: process incoming frames until close, error, or liveness
    // failure. The heartbeat task signals liveness failure through a oneshot
    // so the reader doesn't stay parked on a dead stream.
    loop {
        tokio::select! {
            _ = &mut dead_rx => {
                break;
            }
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(msg)) => match msg {
                    Message::Text(text) => {
                        protocol::handle_text_frame(&text, conn, &tx, &state, &mut authenticated);
                    }
                    Message::Pong(_) => {
                        alive.store(true, Ordering::SeqCst);
                    }
                    Message::Ping(data) => {
                        // Respond to client pings with pong
                        let _ = tx.send(Message::Pong(data));
                    }
                    Message::Binary(_) => {
                        tracing::debug!(conn, "binary frame ignored");
                    }
                    Message::Close(frame) => {
                        tracing::info!(conn, reason = ?frame, "client initiated close");
                        break;
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(conn, error = %e, "WebSocket receive error");
                    break;
                }
                None => {
                    tracing::info!(conn, "WebSocket stream ended");
                    break;
                }
            }
        }
    }

    // Cleanup: abort writer and heartbeat tasks
    writer_handle.abort();
    heartbeat_handle.abort();

    // Full state cleanup: topic subscriptions, room membership with the
    // peer-left broadcast, destroy timer if the room emptied. No-op if this
    // connection never authenticated.
    lifecycle::remove_peer(&state, conn);

    tracing::info!(conn, "connection closed");
}

/// Writer task: receives messages from the mpsc channel and forwards them to
/// the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}

pub mod actor;
pub mod handler;
pub mod protocol;

use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Opaque identifier for a single WebSocket connection, allocated at accept
/// time. Used as the subscriber key in the topic index and the key of the
/// connection -> peer reverse index.
pub type ConnId = u64;

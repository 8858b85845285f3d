use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::rooms::store::RelayCore;
use crate::ws::ConnId;

/// Shared application state passed to all handlers via axum State extractor.
///
/// The room store, topic index, and reverse indices live together inside
/// `RelayCore` behind a single mutex: every lookup -> mutate -> broadcast
/// sequence must be atomic across all four structures, which per-structure
/// locking cannot give.
#[derive(Clone)]
pub struct AppState {
    /// Rooms + topic subscriptions + reverse indices, mutated atomically
    pub core: Arc<Mutex<RelayCore>>,
    /// Interval between liveness probes per connection
    pub heartbeat_interval: Duration,
    /// Delay between a room emptying and its destruction
    pub room_grace_period: Duration,
    /// Monotonic connection id allocator
    next_conn_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(heartbeat_interval: Duration, room_grace_period: Duration) -> Self {
        Self {
            core: Arc::new(Mutex::new(RelayCore::new())),
            heartbeat_interval,
            room_grace_period,
            next_conn_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate an id for a newly accepted connection.
    pub fn next_conn_id(&self) -> ConnId {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Lock the relay core.
    pub fn core(&self) -> MutexGuard<'_, RelayCore> {
        lock_core(&self.core)
    }
}

/// Lock the relay core, recovering from poisoning. A handler panicking while
/// holding the lock only loses its own connection; the core's maps stay usable.
pub fn lock_core(core: &Mutex<RelayCore>) -> MutexGuard<'_, RelayCore> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Expiry reaper background task.
//!
//! Redis expires room keys on its own. The in-memory store only evicts an
//! expired key when it is next touched, so rooms nobody visits again would
//! linger; this task sweeps them periodically. It also drops broadcast
//! channels whose subscribers have all disconnected.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is triggered.

use crate::observability::metrics;
use crate::services::EventChannel;
use crate::store::MemoryRoomStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Run the expiry reaper loop.
///
/// # Arguments
///
/// * `store` - In-memory store to sweep; `None` when the store expires keys natively
/// * `events` - Event channel whose idle rooms are pruned
/// * `interval` - Time between sweeps
/// * `cancel_token` - Token for graceful shutdown
pub async fn start_expiry_reaper(
    store: Option<MemoryRoomStore>,
    events: Arc<dyn EventChannel>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    info!(target: "room.tasks.reaper", interval_seconds = interval.as_secs(), "Expiry reaper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep(store.as_ref(), events.as_ref());
            }
            _ = cancel_token.cancelled() => {
                info!(target: "room.tasks.reaper", "Expiry reaper received shutdown signal, exiting");
                break;
            }
        }
    }
}

fn sweep(store: Option<&MemoryRoomStore>, events: &dyn EventChannel) {
    if let Some(store) = store {
        match store.purge_expired() {
            Ok(purged) if purged > 0 => metrics::record_keys_purged(purged),
            Ok(_) => {}
            Err(e) => {
                error!(target: "room.tasks.reaper", error = %e, "Failed to purge expired keys");
            }
        }
    }

    let pruned = events.prune_idle();
    if pruned > 0 {
        debug!(target: "room.tasks.reaper", pruned = pruned, "Dropped idle event channels");
    }
}

//! Fan-out of status snapshots to any number of observers.
//!
//! Each observer owns a `watch` channel. Publishing never blocks: a slow
//! observer sees intermediate snapshots coalesced but always ends up with
//! the latest one. An observer whose receiver is gone is dropped from the
//! registry on the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use super::models::CampaignStatus;

/// Immutable snapshot shared between the campaign task and observers.
pub type Snapshot = Arc<CampaignStatus>;

pub type ObserverId = u64;

/// An observer's handle. Drop the receiver (or call
/// [`ObserverHub::unsubscribe`]) to stop receiving snapshots.
pub struct Subscription {
    pub id: ObserverId,
    pub rx: watch::Receiver<Snapshot>,
}

#[derive(Default)]
pub struct ObserverHub {
    observers: Mutex<HashMap<ObserverId, watch::Sender<Snapshot>>>,
    next_id: AtomicU64,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer seeded with `current`.
    pub fn subscribe(&self, current: Snapshot) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(current);
        self.lock().insert(id, tx);
        debug!(observer = id, "observer registered");
        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        if self.lock().remove(&id).is_some() {
            debug!(observer = id, "observer removed");
        }
    }

    /// Hand `snapshot` to every live observer; prune the dead ones.
    pub fn publish(&self, snapshot: Snapshot) {
        self.lock().retain(|id, tx| {
            let alive = tx.send(Arc::clone(&snapshot)).is_ok();
            if !alive {
                debug!(observer = id, "observer dropped, unregistering");
            }
            alive
        });
    }

    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObserverId, watch::Sender<Snapshot>>> {
        // A poisoned registry is still a valid map; keep serving it.
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! Per-identity concurrent-request accounting.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Tracks how many forwarded calls each identity has in flight.
pub struct ConnectionGauge {
    ceiling: usize,
    counts: Arc<Mutex<HashMap<String, usize>>>,
}

/// Releases its slot when dropped, so a forwarded call holds the slot for
/// exactly its lifetime.
pub struct ConnectionPermit {
    identity: String,
    counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        let mut counts = self.counts.lock();
        if let Some(active) = counts.get_mut(&self.identity) {
            *active = active.saturating_sub(1);
            if *active == 0 {
                counts.remove(&self.identity);
            }
        }
    }
}

impl ConnectionGauge {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Claims a slot for `identity`, or `None` when it is at the ceiling.
    pub fn acquire(&self, identity: &str) -> Option<ConnectionPermit> {
        let mut counts = self.counts.lock();
        let active = counts.entry(identity.to_string()).or_insert(0);
        if *active >= self.ceiling {
            return None;
        }
        *active += 1;
        Some(ConnectionPermit {
            identity: identity.to_string(),
            counts: Arc::clone(&self.counts),
        })
    }

    /// Total in-flight calls across all identities.
    pub fn active_total(&self) -> usize {
        self.counts.lock().values().sum()
    }
}

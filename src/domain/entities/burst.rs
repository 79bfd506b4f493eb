//! Process-wide burst-detection state.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Shared counters for short-horizon flood detection.
///
/// Unlike [`super::RateLimitEntry`] this is not keyed by identity: the
/// guard reacts to total load. Invariants:
/// - `count` belongs to the burst window starting at `window_start`
/// - `recent` holds only timestamps from the last 1000 milliseconds,
///   oldest first
#[derive(Debug)]
pub struct BurstState {
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub recent: VecDeque<DateTime<Utc>>,
}

impl BurstState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
            cooldown_until: None,
            recent: VecDeque::new(),
        }
    }
}

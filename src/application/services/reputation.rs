//! Per-identity reputation scores and score-triggered blocks.
//!
//! Scores start at zero and move down under penalties. Crossing the block
//! threshold installs a time-boxed block here and mirrors it into the
//! rate limiter's global table, so both enforcement paths agree about who
//! is shut out. The mirror write is intentional coupling: the tracker
//! receives the limiter at construction and owns that side effect.
//!
//! Scores do not recover on their own unless a decay rate is configured;
//! the default is zero.

use crate::application::services::rate_limiter::RateLimiter;
use crate::domain::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ReputationSettings {
    /// Score at or below which a block is installed.
    pub block_threshold: i32,
    /// Score at or below which the caller is challenged instead of
    /// admitted. Sits between zero and `block_threshold`.
    pub challenge_threshold: i32,
    pub block_duration: Duration,
    /// Points restored per minute by the sweeper. Zero disables recovery,
    /// making penalties permanent for the process lifetime.
    pub decay_per_minute: i32,
}

impl Default for ReputationSettings {
    fn default() -> Self {
        Self {
            block_threshold: -10,
            challenge_threshold: -5,
            block_duration: Duration::minutes(15),
            decay_per_minute: 0,
        }
    }
}

#[derive(Debug, Default)]
struct ReputationEntry {
    score: i32,
    block_expires_at: Option<DateTime<Utc>>,
}

/// Result of applying one penalty.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyOutcome {
    pub score: i32,
    /// True when this penalty pushed the score across the block threshold
    /// and installed a new block.
    pub crossed_threshold: bool,
}

pub struct ReputationTracker {
    settings: ReputationSettings,
    clock: Arc<dyn Clock>,
    rate_limiter: Arc<RateLimiter>,
    entries: Mutex<HashMap<String, ReputationEntry>>,
}

impl ReputationTracker {
    pub fn new(
        settings: ReputationSettings,
        clock: Arc<dyn Clock>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            settings,
            clock,
            rate_limiter,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Deducts `amount` points from the identity's score.
    ///
    /// Crossing the block threshold while no block is active installs a
    /// fresh time-boxed block and mirrors it into the rate limiter. A
    /// score already below threshold re-arms the block the same way once
    /// the previous one expires.
    pub fn penalize(&self, identity: &str, amount: i32) -> PenaltyOutcome {
        let now = self.clock.now();
        let outcome = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(identity.to_string()).or_default();
            entry.score = entry.score.saturating_sub(amount);

            let block_active = entry.block_expires_at.is_some_and(|at| at > now);
            let crossed = entry.score <= self.settings.block_threshold && !block_active;
            if crossed {
                entry.block_expires_at = Some(now + self.settings.block_duration);
            }
            PenaltyOutcome {
                score: entry.score,
                crossed_threshold: crossed,
            }
        };

        if outcome.crossed_threshold {
            self.rate_limiter
                .impose_block(identity, self.settings.block_duration);
            tracing::warn!(
                identity,
                score = outcome.score,
                "reputation crossed block threshold"
            );
        }

        outcome
    }

    /// Current score; unknown identities score zero.
    pub fn score(&self, identity: &str) -> i32 {
        self.entries
            .lock()
            .get(identity)
            .map_or(0, |entry| entry.score)
    }

    /// Remaining time of the active score-triggered block, if any.
    ///
    /// The block is time-boxed state, not a predicate over the score:
    /// once it expires this returns `None` even while the score stays
    /// below the threshold.
    pub fn blocked_for(&self, identity: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(identity)?
            .block_expires_at
            .filter(|at| *at > now)
            .map(|at| at - now)
    }

    pub fn is_blocked(&self, identity: &str) -> bool {
        self.blocked_for(identity).is_some()
    }

    /// Whether the score sits in the challenge band: at or past the
    /// challenge threshold without an active block.
    pub fn needs_challenge(&self, identity: &str) -> bool {
        !self.is_blocked(identity) && self.score(identity) <= self.settings.challenge_threshold
    }

    /// Forgets the identity entirely. Called after a passed challenge.
    pub fn clear(&self, identity: &str) {
        self.entries.lock().remove(identity);
    }

    /// Applies the configured decay for `elapsed` time and evicts fully
    /// recovered entries. A zero decay rate only evicts.
    pub fn sweep(&self, elapsed: Duration) {
        let now = self.clock.now();
        let restored = (i64::from(self.settings.decay_per_minute) * elapsed.num_seconds() / 60)
            .clamp(0, i64::from(i32::MAX)) as i32;

        let mut entries = self.entries.lock();
        if restored > 0 {
            for entry in entries.values_mut() {
                entry.score = entry.score.saturating_add(restored).min(0);
            }
        }
        entries.retain(|_, entry| {
            entry.score < 0 || entry.block_expires_at.is_some_and(|at| at > now)
        });
    }

    /// Number of identities with live reputation state.
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::rate_limiter::RateLimiterSettings;
    use crate::domain::clock::ManualClock;
    use chrono::TimeZone;

    fn tracker_with(settings: ReputationSettings) -> (ReputationTracker, Arc<RateLimiter>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let limiter = Arc::new(RateLimiter::new(
            RateLimiterSettings::default(),
            Arc::new(clock.clone()),
        ));
        let tracker = ReputationTracker::new(settings, Arc::new(clock.clone()), limiter.clone());
        (tracker, limiter, clock)
    }

    fn tracker() -> (ReputationTracker, Arc<RateLimiter>, ManualClock) {
        tracker_with(ReputationSettings::default())
    }

    #[test]
    fn score_strictly_decreases_under_penalties() {
        let (tracker, _, _) = tracker();

        let mut last = 0;
        for _ in 0..4 {
            let outcome = tracker.penalize("1.2.3.4", 2);
            assert!(outcome.score < last);
            last = outcome.score;
        }
        assert_eq!(tracker.score("1.2.3.4"), -8);
    }

    #[test]
    fn crossing_threshold_blocks_and_mirrors_into_rate_limiter() {
        let (tracker, limiter, _) = tracker();

        for _ in 0..4 {
            assert!(!tracker.penalize("1.2.3.4", 2).crossed_threshold);
        }
        let outcome = tracker.penalize("1.2.3.4", 2);
        assert!(outcome.crossed_threshold);
        assert_eq!(outcome.score, -10);
        assert!(tracker.is_blocked("1.2.3.4"));

        let denied = limiter.admit("1.2.3.4", "/topics").unwrap_err();
        assert_eq!(denied.denial.message, "Global rate limit active");
    }

    #[test]
    fn block_expires_even_while_score_stays_low() {
        let (tracker, _, clock) = tracker();

        tracker.penalize("1.2.3.4", 12);
        assert!(tracker.is_blocked("1.2.3.4"));

        clock.advance(Duration::minutes(14));
        assert!(tracker.is_blocked("1.2.3.4"));

        clock.advance(Duration::minutes(2));
        assert!(!tracker.is_blocked("1.2.3.4"));
        assert_eq!(tracker.score("1.2.3.4"), -12);
    }

    #[test]
    fn penalty_after_expiry_rearms_the_block() {
        let (tracker, _, clock) = tracker();

        tracker.penalize("1.2.3.4", 12);
        clock.advance(Duration::minutes(16));
        assert!(!tracker.is_blocked("1.2.3.4"));

        let outcome = tracker.penalize("1.2.3.4", 1);
        assert!(outcome.crossed_threshold);
        assert!(tracker.is_blocked("1.2.3.4"));
    }

    #[test]
    fn challenge_band_sits_between_thresholds() {
        let (tracker, _, _) = tracker();

        assert!(!tracker.needs_challenge("1.2.3.4"));
        tracker.penalize("1.2.3.4", 5);
        assert!(tracker.needs_challenge("1.2.3.4"));

        // Blocked identities are denied outright, not challenged.
        tracker.penalize("1.2.3.4", 5);
        assert!(tracker.is_blocked("1.2.3.4"));
        assert!(!tracker.needs_challenge("1.2.3.4"));
    }

    #[test]
    fn clear_forgets_the_identity() {
        let (tracker, _, _) = tracker();

        tracker.penalize("1.2.3.4", 6);
        tracker.clear("1.2.3.4");

        assert_eq!(tracker.score("1.2.3.4"), 0);
        assert!(!tracker.needs_challenge("1.2.3.4"));
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn scores_do_not_recover_by_default() {
        let (tracker, _, clock) = tracker();

        tracker.penalize("1.2.3.4", 6);
        clock.advance(Duration::hours(2));
        tracker.sweep(Duration::hours(2));

        assert_eq!(tracker.score("1.2.3.4"), -6);
    }

    #[test]
    fn configured_decay_restores_toward_zero() {
        let (tracker, _, clock) = tracker_with(ReputationSettings {
            decay_per_minute: 1,
            ..ReputationSettings::default()
        });

        tracker.penalize("1.2.3.4", 6);
        clock.advance(Duration::minutes(4));
        tracker.sweep(Duration::minutes(4));
        assert_eq!(tracker.score("1.2.3.4"), -2);

        // Full recovery evicts the entry rather than going positive.
        clock.advance(Duration::minutes(10));
        tracker.sweep(Duration::minutes(10));
        assert_eq!(tracker.score("1.2.3.4"), 0);
        assert_eq!(tracker.tracked(), 0);
    }
}

//! Background eviction of stale admission state.
//!
//! Every windowed table grows with the number of distinct callers, so a
//! periodic sweep evicts entries whose window and block have both lapsed.
//! The sweep takes the same per-table locks as the request path, which
//! keeps it safe to run alongside in-flight admissions.

use crate::application::services::challenge_service::ChallengeService;
use crate::application::services::rate_limiter::RateLimiter;
use crate::application::services::reputation::ReputationTracker;
use crate::domain::clock::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Runs the sweep loop until the task is aborted.
///
/// Spawn once at startup:
///
/// ```rust,ignore
/// tokio::spawn(run_sweeper(
///     rate_limiter,
///     reputation,
///     challenges,
///     clock,
///     Duration::from_secs(60),
/// ));
/// ```
pub async fn run_sweeper(
    rate_limiter: Arc<RateLimiter>,
    reputation: Arc<ReputationTracker>,
    challenges: Arc<ChallengeService>,
    clock: Arc<dyn Clock>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; consume it so the loop
    // sweeps on the period, not at startup.
    ticker.tick().await;

    let mut last_sweep = clock.now();
    loop {
        ticker.tick().await;
        let now = clock.now();

        let evicted = rate_limiter.sweep();
        reputation.sweep(now - last_sweep);
        challenges.sweep();
        last_sweep = now;

        tracing::debug!(
            evicted,
            tracked_identities = rate_limiter.tracked_identities(),
            reputation_entries = reputation.tracked(),
            pending_challenges = challenges.pending_count(),
            "admission state swept"
        );
    }
}

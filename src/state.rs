//! Shared application state.
//!
//! One instance of every admission service, constructed once at startup
//! and injected into handlers and middleware through Axum state. Nothing
//! is ambient: tests build isolated instances per case with their own
//! clocks.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::application::services::{
    AdmissionService, BurstGuard, ChallengeService, RateLimiter, ReputationTracker,
};
use crate::config::Config;
use crate::domain::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub reputation: Arc<ReputationTracker>,
    pub burst: Arc<BurstGuard>,
    pub challenges: Arc<ChallengeService>,
    /// Handle of the background sweeper, when one was spawned. Health
    /// checks report on it; embedded setups may leave it `None`.
    pub sweeper: Option<Arc<JoinHandle<()>>>,
}

impl AppState {
    /// Wires the full service graph from configuration.
    ///
    /// The reputation tracker receives the rate limiter so that a score
    /// crossing its threshold installs a block in the same table the
    /// limiter enforces.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limiter_settings(),
            clock.clone(),
        ));
        let reputation = Arc::new(ReputationTracker::new(
            config.reputation_settings(),
            clock.clone(),
            rate_limiter.clone(),
        ));
        let burst = Arc::new(BurstGuard::new(config.burst_settings(), clock.clone()));
        let challenges = Arc::new(ChallengeService::new(
            config.challenge_signing_secret.clone(),
            config.challenge_settings(),
            clock,
        ));
        let admission = Arc::new(AdmissionService::new(
            config.admission_settings(),
            rate_limiter.clone(),
            reputation.clone(),
            burst.clone(),
            challenges.clone(),
        ));

        Self {
            admission,
            rate_limiter,
            reputation,
            burst,
            challenges,
            sweeper: None,
        }
    }

    /// Attaches the sweeper handle for health reporting.
    pub fn with_sweeper(mut self, handle: JoinHandle<()>) -> Self {
        self.sweeper = Some(Arc::new(handle));
        self
    }
}

#![allow(dead_code)]

use axum::{
    Router, middleware,
    routing::{get, post},
};
use chrono::{TimeZone, Utc};
use gatewarden::api::middleware::admission;
use gatewarden::application::services::{
    AdmissionService, AdmissionSettings, BurstGuard, BurstGuardSettings, ChallengeService,
    ChallengeSettings, RateLimiter, RateLimiterSettings, ReputationSettings, ReputationTracker,
};
use gatewarden::domain::clock::{Clock, ManualClock};
use gatewarden::state::AppState;
use std::sync::Arc;

pub const TEST_SECRET: &str = "test-signing-secret";

pub const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0";

pub fn manual_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
}

pub fn create_test_state(clock: &ManualClock) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());

    let rate_limiter = Arc::new(RateLimiter::new(
        RateLimiterSettings::default(),
        clock.clone(),
    ));
    let reputation = Arc::new(ReputationTracker::new(
        ReputationSettings::default(),
        clock.clone(),
        rate_limiter.clone(),
    ));
    let burst = Arc::new(BurstGuard::new(BurstGuardSettings::default(), clock.clone()));
    let challenges = Arc::new(ChallengeService::new(
        TEST_SECRET.to_string(),
        ChallengeSettings::default(),
        clock,
    ));
    let admission = Arc::new(AdmissionService::new(
        AdmissionSettings::default(),
        rate_limiter.clone(),
        reputation.clone(),
        burst.clone(),
        challenges.clone(),
    ));

    AppState {
        admission,
        rate_limiter,
        reputation,
        burst,
        challenges,
        sweeper: None,
    }
}

async fn ok_handler() -> &'static str {
    "ok"
}

/// Router with representative routes of each class, all behind the
/// admission layer.
pub fn protected_app(state: AppState) -> Router {
    Router::new()
        .route("/topics", get(ok_handler))
        .route("/login", post(ok_handler))
        .route("/register", post(ok_handler))
        .route("/api/echo", get(ok_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admission::layer,
        ))
        .with_state(state)
}

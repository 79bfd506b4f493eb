//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Rate limiter**: Table is reachable; reports tracked identities
/// 2. **Challenge store**: Reports outstanding challenges
/// 3. **Sweeper**: Background eviction task is still running
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let rate_limiter_check = check_rate_limiter(&state);
    let challenge_check = check_challenge_store(&state);
    let sweeper_check = check_sweeper(&state);

    let all_healthy = rate_limiter_check.status == "ok"
        && challenge_check.status == "ok"
        && sweeper_check.status == "ok";

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            rate_limiter: rate_limiter_check,
            challenge_store: challenge_check,
            sweeper: sweeper_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

fn check_rate_limiter(state: &AppState) -> CheckStatus {
    let tracked = state.rate_limiter.tracked_identities();
    let blocked = state.rate_limiter.active_blocks();
    CheckStatus {
        status: "ok".to_string(),
        message: Some(format!(
            "Tracking {tracked} identities, {blocked} blocked"
        )),
    }
}

fn check_challenge_store(state: &AppState) -> CheckStatus {
    CheckStatus {
        status: "ok".to_string(),
        message: Some(format!(
            "{} challenges outstanding",
            state.challenges.pending_count()
        )),
    }
}

/// The sweeper is optional in embedded and test setups; absent means
/// eviction is the host's responsibility, not a failure.
fn check_sweeper(state: &AppState) -> CheckStatus {
    match &state.sweeper {
        None => CheckStatus {
            status: "ok".to_string(),
            message: Some("Sweeper not configured".to_string()),
        },
        Some(handle) if handle.is_finished() => CheckStatus {
            status: "error".to_string(),
            message: Some("Sweeper task exited".to_string()),
        },
        Some(_) => CheckStatus {
            status: "ok".to_string(),
            message: Some("Sweeper running".to_string()),
        },
    }
}

//! Handler for the gate introspection endpoint.

use axum::{Json, extract::State};

use crate::api::dto::stats::StatsResponse;
use crate::state::AppState;

/// Returns a snapshot of the gate's in-memory state.
///
/// # Endpoint
///
/// `GET /admin/stats`
///
/// Counts come straight from the service tables; the snapshot is not
/// atomic across components, which is fine for an operator's glance.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        tracked_identities: state.rate_limiter.tracked_identities(),
        active_blocks: state.rate_limiter.active_blocks(),
        reputation_entries: state.reputation.tracked(),
        pending_challenges: state.challenges.pending_count(),
        burst_window_count: state.burst.window_count(),
        burst_cooldown_active: state.burst.cooldown_active(),
        active_connections: state.admission.active_connections(),
    })
}

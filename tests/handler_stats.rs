mod common;

use axum::http::StatusCode;
use axum::{Router, middleware, routing::get};
use axum_test::TestServer;
use chrono::Duration;
use gatewarden::api::middleware::admission;
use gatewarden::api::routes::protected_routes;
use serde_json::Value;

use common::BROWSER_UA;

fn stats_app(state: gatewarden::state::AppState) -> Router {
    protected_routes()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admission::layer,
        ))
        .with_state(state)
}

#[tokio::test]
async fn test_stats_snapshot_reflects_gate_state() {
    let clock = common::manual_clock();
    let state = common::create_test_state(&clock);
    state.reputation.penalize("5.5.5.5", 3);
    state.challenges.issue();
    let server = TestServer::new(stats_app(state)).unwrap();

    let response = server
        .get("/admin/stats")
        .add_header("cf-connecting-ip", "203.0.113.7")
        .add_header("user-agent", BROWSER_UA)
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    // The stats request itself is the one tracked identity.
    assert_eq!(json["tracked_identities"], 1);
    assert_eq!(json["active_blocks"], 0);
    assert_eq!(json["reputation_entries"], 1);
    assert_eq!(json["pending_challenges"], 1);
    assert_eq!(json["burst_cooldown_active"], false);
    // The permit for this very request is still held while the handler
    // runs, so the gauge reports it.
    assert_eq!(json["active_connections"], 1);
}

#[tokio::test]
async fn test_stats_route_is_itself_admission_guarded() {
    let clock = common::manual_clock();
    let state = common::create_test_state(&clock);
    state
        .rate_limiter
        .impose_block("9.9.9.9", Duration::minutes(15));
    let server = TestServer::new(stats_app(state)).unwrap();

    let response = server
        .get("/admin/stats")
        .add_header("cf-connecting-ip", "9.9.9.9")
        .add_header("user-agent", BROWSER_UA)
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

mod common;

use axum::{Router, routing::get};
use axum_test::TestServer;
use gatewarden::api::handlers::challenge_handler;

fn challenge_app(state: gatewarden::state::AppState) -> Router {
    Router::new()
        .route("/challenge", get(challenge_handler))
        .with_state(state)
}

#[tokio::test]
async fn test_challenge_page_embeds_signed_material() {
    let clock = common::manual_clock();
    let state = common::create_test_state(&clock);
    let server = TestServer::new(challenge_app(state.clone())).unwrap();

    let response = server.get("/challenge").await;

    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("Checking your browser"));
    assert!(body.contains("issued_at_ms"));
    assert!(body.contains("signature"));
    assert!(body.contains(r#"var target = "/""#));

    // Issuance registered a pending challenge for later validation.
    assert_eq!(state.challenges.pending_count(), 1);
}

#[tokio::test]
async fn test_challenge_page_keeps_relative_redirect() {
    let clock = common::manual_clock();
    let state = common::create_test_state(&clock);
    let server = TestServer::new(challenge_app(state)).unwrap();

    let response = server
        .get("/challenge")
        .add_query_param("redirect", "/topics?page=2")
        .await;

    response.assert_status_ok();
    assert!(response.text().contains(r#"var target = "/topics?page=2""#));
}

#[tokio::test]
async fn test_challenge_page_rejects_offsite_redirect() {
    let clock = common::manual_clock();
    let state = common::create_test_state(&clock);
    let server = TestServer::new(challenge_app(state)).unwrap();

    for target in ["https://evil.example/phish", "//evil.example", "javascript:alert(1)"] {
        let response = server
            .get("/challenge")
            .add_query_param("redirect", target)
            .await;

        response.assert_status_ok();
        assert!(
            response.text().contains(r#"var target = "/""#),
            "offsite target {target} must be replaced"
        );
    }
}

#[tokio::test]
async fn test_each_page_issues_a_distinct_challenge() {
    let clock = common::manual_clock();
    let state = common::create_test_state(&clock);
    let server = TestServer::new(challenge_app(state.clone())).unwrap();

    server.get("/challenge").await.assert_status_ok();
    server.get("/challenge").await.assert_status_ok();

    assert_eq!(state.challenges.pending_count(), 2);
}

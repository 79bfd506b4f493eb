//! Interstitial challenge page handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::state::AppState;

/// Template for the interstitial challenge page.
///
/// Renders `templates/challenge.html`: a self-contained page that runs a
/// fixed-iteration proof-of-work loop, collects a browser fingerprint,
/// and redirects back to `redirect_to` with a `challenge_token` query
/// parameter appended.
#[derive(Template, WebTemplate)]
#[template(path = "challenge.html")]
pub struct ChallengeTemplate {
    pub challenge_id: String,
    pub issued_at_ms: i64,
    pub signature: String,
    pub redirect_to: String,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    pub redirect: Option<String>,
}

/// Serves a fresh challenge page.
///
/// # Endpoint
///
/// `GET /challenge?redirect=/original/path`
pub async fn challenge_handler(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> impl IntoResponse {
    challenge_response(&state, query.redirect.as_deref().unwrap_or("/"))
}

/// Builds the challenge page for `redirect_to`.
///
/// Also used by the admission middleware when it intercepts a
/// near-threshold caller in place of the requested response.
pub fn challenge_response(state: &AppState, redirect_to: &str) -> Response {
    let issued = state.challenges.issue();
    ChallengeTemplate {
        challenge_id: issued.id,
        issued_at_ms: issued.issued_at_ms,
        signature: issued.signature,
        redirect_to: sanitize_redirect(redirect_to),
    }
    .into_response()
}

/// Only same-origin relative paths survive as redirect targets, and only
/// with characters that cannot break out of the script block they are
/// embedded in.
fn sanitize_redirect(target: &str) -> String {
    // An absolute URL parses on its own; a relative path does not.
    if url::Url::parse(target).is_ok() {
        return "/".to_string();
    }
    let relative = target.starts_with('/') && !target.starts_with("//");
    let embeddable = target.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.' | '?' | '&' | '=' | '%' | '+' | '~')
    });
    if relative && embeddable {
        target.to_string()
    } else {
        "/".to_string()
    }
}

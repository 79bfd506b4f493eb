//! Request-admission middleware.
//!
//! Every request routed through this layer passes the admission pipeline
//! before it reaches its handler. Refusals never reach the inner service:
//! a denial becomes a synthetic 429 with a `Retry-After` header, and a
//! near-threshold caller receives the interstitial challenge page in
//! place of the requested response.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::handlers::challenge::challenge_response;
use crate::application::services::AdmissionOutcome;
use crate::state::AppState;

/// Admission middleware for protected routes.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, middleware, routing::get};
/// use gatewarden::api::middleware::admission;
///
/// let protected = Router::new()
///     .route("/api/topics", get(topics_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), admission::layer));
/// ```
pub async fn layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let original_uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let token = challenge_token(req.uri().query());

    match state
        .admission
        .admit(req.headers(), &path, &method, token.as_deref())
    {
        AdmissionOutcome::Forward(permit) => {
            metrics::counter!("admission_requests_total", "outcome" => "admitted").increment(1);
            let response = next.run(req).await;
            // The permit spans the forwarded call's full lifetime.
            drop(permit);
            response
        }
        AdmissionOutcome::Challenge => {
            metrics::counter!("admission_requests_total", "outcome" => "challenged").increment(1);
            tracing::info!(%method, %path, "serving challenge page");
            challenge_response(&state, &original_uri)
        }
        AdmissionOutcome::Deny(denial) => {
            metrics::counter!("admission_denials_total", "reason" => denial.reason.as_str())
                .increment(1);
            tracing::warn!(
                %method,
                %path,
                reason = %denial.reason,
                retry_after = denial.retry_after_secs,
                "request denied"
            );
            denial.into_response()
        }
    }
}

/// Extracts the raw `challenge_token` query value, if present.
fn challenge_token(query: Option<&str>) -> Option<String> {
    let query = query?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "challenge_token").then(|| value.to_string())
    })
}

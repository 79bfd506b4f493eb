//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET /health`      - Component health checks (public)
//! - `GET /challenge`   - Interstitial challenge page (public)
//! - `GET /admin/stats` - Gate introspection (behind admission)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging on every route
//! - **Admission** - Rate limiting, reputation, burst guarding, and
//!   challenges on protected routes
//! - **Path normalization** - Trailing slash handling
//!
//! The health and challenge endpoints stay outside the admission layer:
//! a caller being rate limited must still be able to fetch and solve its
//! challenge, and probes must not consume admission budget.

use crate::api;
use crate::api::handlers::{challenge_handler, health_handler};
use crate::api::middleware::{admission, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let protected = api::routes::protected_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        admission::layer,
    ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/challenge", get(challenge_handler))
        .merge(protected)
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

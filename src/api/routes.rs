//! Gate-protected route configuration.
//!
//! Everything registered here sits behind the admission middleware; see
//! [`crate::routes::app_router`] for the layering.

use crate::api::handlers::stats_handler;
use crate::state::AppState;
use axum::{Router, routing::get};

/// Routes served only to admitted callers.
///
/// # Endpoints
///
/// - `GET /admin/stats` - snapshot of the gate's in-memory state
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/admin/stats", get(stats_handler))
}

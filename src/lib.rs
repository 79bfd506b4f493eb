//! # Gatewarden
//!
//! Request-admission middleware for Axum services: rate limiting,
//! reputation tracking, burst protection, and proof-of-work challenges at
//! a trusted server boundary.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer
//! separation:
//!
//! - **Domain Layer** ([`domain`]) - Entities, identity resolution, and
//!   other pure admission logic
//! - **Application Layer** ([`application`]) - The admission services and
//!   the background sweeper
//! - **API Layer** ([`api`]) - Middleware, operational handlers, and DTOs
//!
//! ## Admission Pipeline
//!
//! Every request on a protected route flows through one decision:
//!
//! 1. Resolve the caller identity from proxy headers
//! 2. Settle an attached `challenge_token`, clearing reputation on success
//! 3. Ingest suspicious-header signals into the reputation score
//! 4. Check the per-identity and per-route-class rate limits
//! 5. Check the reputation block, or challenge a near-threshold caller
//! 6. Check the process-wide burst guard
//! 7. Claim a concurrent-connection slot for the forwarded call
//!
//! A refusal synthesizes an HTTP 429 with a `Retry-After` header; a
//! challenged caller receives a self-contained HTML page that solves a
//! proof of work and redirects back with a token.
//!
//! ## Quick Start
//!
//! ```bash
//! export CHALLENGE_SIGNING_SECRET="change-me"
//!
//! # Start the gate
//! cargo run
//! ```
//!
//! To embed the gate in an existing Axum service, build an
//! [`state::AppState`] and layer [`api::middleware::admission::layer`]
//! onto the routes to protect:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/api/topics", get(topics_handler))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), admission::layer));
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via
//! [`config::Config`]. See [`config`] module for available options.
//!
//! ## Scope
//!
//! The gate makes admission cheap to enforce and expensive to flood; it
//! is not an authentication layer and does not inspect request bodies.
//! Confidentiality is the transport's job: terminate TLS in front of or
//! inside the host service.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod state;

pub mod config;
pub mod server;

pub mod routes;

pub use error::{Denial, DenialReason};
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library
/// users and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        AdmissionOutcome, AdmissionService, BurstGuard, ChallengeService, RateLimiter,
        ReputationTracker,
    };
    pub use crate::domain::clock::{Clock, ManualClock, SystemClock};
    pub use crate::domain::identity::resolve_identity;
    pub use crate::error::{Denial, DenialReason};
    pub use crate::state::AppState;
}

//! Core entities representing the admission data model.
//!
//! Entities are plain data structures with small invariant-preserving
//! methods; the check-then-act sequences around them live in the
//! application services.
//!
//! # Entity Types
//!
//! - [`RateLimitEntry`] - one identity's counter within the current window
//! - [`RouteClass`] - coarse path category selecting a rate-limit tier
//! - [`BurstState`] - process-wide burst and requests-per-second state
//! - [`ChallengeToken`] - decoded `challenge_token` query parameter

pub mod burst;
pub mod challenge;
pub mod rate_limit;

pub use burst::BurstState;
pub use challenge::{ChallengeToken, TokenDecodeError};
pub use rate_limit::{RateLimitEntry, RouteClass};

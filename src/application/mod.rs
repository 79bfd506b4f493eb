//! Application layer orchestrating the admission pipeline.
//!
//! # Modules
//!
//! - [`services`] - the admission components and their composition
//! - [`sweeper`] - background eviction of stale admission state

pub mod services;
pub mod sweeper;

//! HTTP middleware for request admission and observability.

pub mod admission;
pub mod tracing;

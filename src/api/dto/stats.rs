//! DTOs for the gate introspection endpoint.

use serde::Serialize;

/// Snapshot of the gate's in-memory state.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Identities with a live rate-limit entry.
    pub tracked_identities: usize,
    /// Identities currently under an active block.
    pub active_blocks: usize,
    /// Identities with live reputation state.
    pub reputation_entries: usize,
    /// Challenges issued and not yet solved or expired.
    pub pending_challenges: usize,
    /// Arrivals counted in the current burst window.
    pub burst_window_count: u32,
    /// Whether the global burst cooldown is in force.
    pub burst_cooldown_active: bool,
    /// Forwarded calls currently in flight.
    pub active_connections: usize,
}

//! Caller identity resolution from request headers.
//!
//! The resolved identity is the primary key for all rate-limit and
//! reputation state. Resolution is a pure function of the headers and
//! never fails: callers that cannot be resolved share the
//! [`UNKNOWN_IDENTITY`] bucket, an accepted imprecision.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Shared bucket for callers whose address cannot be resolved.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Single-address header set by a trusted reverse proxy. Checked first.
const TRUSTED_PROXY_HEADER: &str = "cf-connecting-ip";

/// Comma-separated proxy chain, left-most entry closest to the client.
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

const REAL_IP_HEADER: &str = "x-real-ip";
const CLIENT_IP_HEADER: &str = "x-client-ip";

/// Resolves the best-effort caller identity from request headers.
///
/// # Resolution Order
///
/// 1. `cf-connecting-ip` - single address from a trusted proxy
/// 2. `x-forwarded-for` - left-most *public* entry of the chain; private
///    and loopback entries are attacker-suppliable and skipped
/// 3. `x-real-ip`
/// 4. `x-client-ip`
/// 5. [`UNKNOWN_IDENTITY`]
///
/// Malformed values are skipped rather than trusted.
pub fn resolve_identity(headers: &HeaderMap) -> String {
    if let Some(ip) = single_address(headers, TRUSTED_PROXY_HEADER) {
        return ip.to_string();
    }
    if let Some(ip) = forwarded_chain_address(headers) {
        return ip.to_string();
    }
    if let Some(ip) = single_address(headers, REAL_IP_HEADER) {
        return ip.to_string();
    }
    if let Some(ip) = single_address(headers, CLIENT_IP_HEADER) {
        return ip.to_string();
    }
    UNKNOWN_IDENTITY.to_string()
}

/// Parses a header expected to carry exactly one address.
fn single_address(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Walks the forwarded-for chain left to right and returns the first
/// public address.
fn forwarded_chain_address(headers: &HeaderMap) -> Option<IpAddr> {
    let raw = headers.get(FORWARDED_FOR_HEADER)?.to_str().ok()?;
    raw.split(',')
        .filter_map(|entry| entry.trim().parse::<IpAddr>().ok())
        .find(|ip| !is_private_address(*ip))
}

/// Whether the address belongs to a private or loopback range
/// (10/8, 172.16/12, 192.168/16, 127.0.0.1, ::1).
pub fn is_private_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

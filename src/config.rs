//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the
//! server starts.
//!
//! ## Required Variables
//!
//! - `CHALLENGE_SIGNING_SECRET` - HMAC key for challenge tokens
//!
//! ## Optional Variables
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `SWEEP_INTERVAL_SECS` - Stale-state eviction period (default: 60)
//!
//! ### Rate limiting
//!
//! - `RATE_GLOBAL_LIMIT` - requests per window per identity (default: 120)
//! - `RATE_WINDOW_SECS` - counting window (default: 60)
//! - `RATE_BLOCK_SECS` - block installed on violation (default: 900)
//! - `RATE_API_LIMIT` - `/api/` tier ceiling (default: 60)
//! - `RATE_LOGIN_LIMIT` - login tier ceiling (default: 5)
//! - `RATE_REGISTER_LIMIT` - registration tier ceiling (default: 3)
//! - `RATE_REGISTER_WINDOW_SECS` - registration bucket (default: 3600)
//!
//! ### Reputation
//!
//! - `REPUTATION_BLOCK_THRESHOLD` - score installing a block (default: -10)
//! - `REPUTATION_CHALLENGE_THRESHOLD` - score triggering a challenge
//!   (default: -5)
//! - `REPUTATION_DECAY_PER_MINUTE` - points restored per minute; zero
//!   keeps penalties permanent for the process lifetime (default: 0)
//! - `REPUTATION_ROUTE_PENALTY` - points deducted on a route-ceiling
//!   violation (default: 3)
//!
//! ### Burst protection
//!
//! - `BURST_LIMIT` (default: 30), `BURST_WINDOW_SECS` (default: 5),
//!   `BURST_COOLDOWN_SECS` (default: 30), `RPS_LIMIT` (default: 20)
//!
//! ### Challenges and connections
//!
//! - `CHALLENGE_MAX_AGE_SECS` (default: 300)
//! - `CHALLENGE_MIN_SOLVE_MS` (default: 500)
//! - `MAX_CONCURRENT_REQUESTS` - per identity (default: 15)

use anyhow::{Context, Result};
use chrono::Duration;
use std::env;
use std::str::FromStr;

use crate::application::services::{
    AdmissionSettings, BurstGuardSettings, ChallengeSettings, RateLimiterSettings,
    ReputationSettings,
};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// HMAC signing secret for challenge tokens. Loaded from
    /// `CHALLENGE_SIGNING_SECRET`. Must be non-empty.
    pub challenge_signing_secret: String,
    pub sweep_interval_secs: u64,

    // ── Rate limiter ────────────────────────────────────────────────────
    pub global_limit: u32,
    pub window_secs: u64,
    pub block_secs: u64,
    pub api_limit: u32,
    pub login_limit: u32,
    pub register_limit: u32,
    pub register_window_secs: u64,

    // ── Reputation ──────────────────────────────────────────────────────
    pub reputation_block_threshold: i32,
    pub reputation_challenge_threshold: i32,
    pub reputation_decay_per_minute: i32,
    pub route_violation_penalty: i32,

    // ── Burst guard ─────────────────────────────────────────────────────
    pub burst_limit: u32,
    pub burst_window_secs: u64,
    pub burst_cooldown_secs: u64,
    pub rps_limit: usize,

    // ── Challenges and connections ──────────────────────────────────────
    pub challenge_max_age_secs: u64,
    pub challenge_min_solve_ms: i64,
    pub max_concurrent: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `CHALLENGE_SIGNING_SECRET` is missing.
    pub fn from_env() -> Result<Self> {
        let challenge_signing_secret = env::var("CHALLENGE_SIGNING_SECRET")
            .context("CHALLENGE_SIGNING_SECRET must be set")?;

        Ok(Self {
            listen_addr: env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            challenge_signing_secret,
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 60),

            global_limit: env_parse("RATE_GLOBAL_LIMIT", 120),
            window_secs: env_parse("RATE_WINDOW_SECS", 60),
            block_secs: env_parse("RATE_BLOCK_SECS", 900),
            api_limit: env_parse("RATE_API_LIMIT", 60),
            login_limit: env_parse("RATE_LOGIN_LIMIT", 5),
            register_limit: env_parse("RATE_REGISTER_LIMIT", 3),
            register_window_secs: env_parse("RATE_REGISTER_WINDOW_SECS", 3600),

            reputation_block_threshold: env_parse("REPUTATION_BLOCK_THRESHOLD", -10),
            reputation_challenge_threshold: env_parse("REPUTATION_CHALLENGE_THRESHOLD", -5),
            reputation_decay_per_minute: env_parse("REPUTATION_DECAY_PER_MINUTE", 0),
            route_violation_penalty: env_parse("REPUTATION_ROUTE_PENALTY", 3),

            burst_limit: env_parse("BURST_LIMIT", 30),
            burst_window_secs: env_parse("BURST_WINDOW_SECS", 5),
            burst_cooldown_secs: env_parse("BURST_COOLDOWN_SECS", 30),
            rps_limit: env_parse("RPS_LIMIT", 20),

            challenge_max_age_secs: env_parse("CHALLENGE_MAX_AGE_SECS", 300),
            challenge_min_solve_ms: env_parse("CHALLENGE_MIN_SOLVE_MS", 500),
            max_concurrent: env_parse("MAX_CONCURRENT_REQUESTS", 15),
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any ceiling or window is zero, the thresholds
    /// are not ordered, or the listen address and log format are
    /// malformed.
    pub fn validate(&self) -> Result<()> {
        if self.challenge_signing_secret.is_empty() {
            anyhow::bail!("CHALLENGE_SIGNING_SECRET must not be empty");
        }

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        for (name, value) in [
            ("RATE_GLOBAL_LIMIT", u64::from(self.global_limit)),
            ("RATE_WINDOW_SECS", self.window_secs),
            ("RATE_BLOCK_SECS", self.block_secs),
            ("RATE_API_LIMIT", u64::from(self.api_limit)),
            ("RATE_LOGIN_LIMIT", u64::from(self.login_limit)),
            ("RATE_REGISTER_LIMIT", u64::from(self.register_limit)),
            ("RATE_REGISTER_WINDOW_SECS", self.register_window_secs),
            ("BURST_LIMIT", u64::from(self.burst_limit)),
            ("BURST_WINDOW_SECS", self.burst_window_secs),
            ("BURST_COOLDOWN_SECS", self.burst_cooldown_secs),
            ("RPS_LIMIT", self.rps_limit as u64),
            ("CHALLENGE_MAX_AGE_SECS", self.challenge_max_age_secs),
            ("MAX_CONCURRENT_REQUESTS", self.max_concurrent as u64),
            ("SWEEP_INTERVAL_SECS", self.sweep_interval_secs),
        ] {
            if value == 0 {
                anyhow::bail!("{name} must be greater than 0");
            }
        }

        if self.reputation_block_threshold >= 0 {
            anyhow::bail!(
                "REPUTATION_BLOCK_THRESHOLD must be negative, got {}",
                self.reputation_block_threshold
            );
        }
        if self.reputation_challenge_threshold > 0
            || self.reputation_challenge_threshold <= self.reputation_block_threshold
        {
            anyhow::bail!(
                "REPUTATION_CHALLENGE_THRESHOLD must sit between {} and 0, got {}",
                self.reputation_block_threshold,
                self.reputation_challenge_threshold
            );
        }
        if self.reputation_decay_per_minute < 0 {
            anyhow::bail!(
                "REPUTATION_DECAY_PER_MINUTE must not be negative, got {}",
                self.reputation_decay_per_minute
            );
        }
        if self.route_violation_penalty <= 0 {
            anyhow::bail!(
                "REPUTATION_ROUTE_PENALTY must be greater than 0, got {}",
                self.route_violation_penalty
            );
        }
        if self.challenge_min_solve_ms < 0 {
            anyhow::bail!(
                "CHALLENGE_MIN_SOLVE_MS must not be negative, got {}",
                self.challenge_min_solve_ms
            );
        }

        Ok(())
    }

    pub fn rate_limiter_settings(&self) -> RateLimiterSettings {
        RateLimiterSettings {
            global_limit: self.global_limit,
            window: Duration::seconds(self.window_secs as i64),
            block_duration: Duration::seconds(self.block_secs as i64),
            api_limit: self.api_limit,
            login_limit: self.login_limit,
            register_limit: self.register_limit,
            register_window: Duration::seconds(self.register_window_secs as i64),
        }
    }

    pub fn reputation_settings(&self) -> ReputationSettings {
        ReputationSettings {
            block_threshold: self.reputation_block_threshold,
            challenge_threshold: self.reputation_challenge_threshold,
            block_duration: Duration::seconds(self.block_secs as i64),
            decay_per_minute: self.reputation_decay_per_minute,
        }
    }

    pub fn burst_settings(&self) -> BurstGuardSettings {
        BurstGuardSettings {
            burst_limit: self.burst_limit,
            burst_window: Duration::seconds(self.burst_window_secs as i64),
            cooldown: Duration::seconds(self.burst_cooldown_secs as i64),
            rps_limit: self.rps_limit,
            rps_retry_after: Duration::seconds(5),
        }
    }

    pub fn challenge_settings(&self) -> ChallengeSettings {
        ChallengeSettings {
            max_age: Duration::seconds(self.challenge_max_age_secs as i64),
            min_solve_ms: self.challenge_min_solve_ms,
        }
    }

    pub fn admission_settings(&self) -> AdmissionSettings {
        AdmissionSettings {
            max_concurrent: self.max_concurrent,
            route_violation_penalty: self.route_violation_penalty,
        }
    }

    /// Prints configuration summary (without the signing secret).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!(
            "  Global limit: {}/{}s, block {}s",
            self.global_limit,
            self.window_secs,
            self.block_secs
        );
        tracing::info!(
            "  Tiers: api {}/{}s, login {}/{}s, register {}/{}s",
            self.api_limit,
            self.window_secs,
            self.login_limit,
            self.window_secs,
            self.register_limit,
            self.register_window_secs
        );
        tracing::info!(
            "  Reputation: block at {}, challenge at {}, decay {}/min",
            self.reputation_block_threshold,
            self.reputation_challenge_threshold,
            self.reputation_decay_per_minute
        );
        tracing::info!(
            "  Burst: {}/{}s, cooldown {}s, rps {}",
            self.burst_limit,
            self.burst_window_secs,
            self.burst_cooldown_secs,
            self.rps_limit
        );
        tracing::info!("  Sweep interval: {}s", self.sweep_interval_secs);
    }
}

/// Parses an environment variable, falling back to `default` when it is
/// unset or unparseable.
fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if required variables are missing or validation
/// fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

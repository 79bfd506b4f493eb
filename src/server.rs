//! HTTP server initialization and runtime setup.
//!
//! Handles service wiring, sweeper spawning, and Axum server lifecycle.

use crate::application::sweeper::run_sweeper;
use crate::config::Config;
use crate::domain::clock::{Clock, SystemClock};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::Result;
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - The admission service graph on the system clock
/// - The background sweeper
/// - The Axum HTTP server with graceful shutdown on ctrl-c
///
/// # Errors
///
/// Returns an error if the listen address is invalid, the bind fails, or
/// a server runtime error occurs.
pub async fn run(config: Config) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::from_config(&config, clock.clone());

    let sweeper = tokio::spawn(run_sweeper(
        state.rate_limiter.clone(),
        state.reputation.clone(),
        state.challenges.clone(),
        clock,
        Duration::from_secs(config.sweep_interval_secs),
    ));
    tracing::info!("Sweeper started");

    let state = state.with_sweeper(sweeper);
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}

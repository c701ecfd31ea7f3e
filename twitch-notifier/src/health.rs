//! HTTP health surface.
//!
//! Read-only process status for external uptime monitors: "/" reports
//! basic status and uptime, "/health" reports the live flag published by
//! the stream monitor.

use std::time::Instant;

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;

/// Shared state for the health router.
#[derive(Clone)]
pub struct HealthState {
    /// Channel login being monitored.
    pub monitored_channel: String,
    /// Live flag published by the monitor.
    pub live_rx: watch::Receiver<bool>,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Create the health router.
pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .with_state(state)
}

async fn status(State(state): State<HealthState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "monitored_channel": state.monitored_channel,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn health(State(state): State<HealthState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "stream_live": *state.live_rx.borrow(),
    }))
}

/// Serve the health endpoints until cancelled.
pub async fn serve(port: u16, state: HealthState, cancel: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "health server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

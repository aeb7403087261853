//! Health endpoint.
//!
//! A single `GET /health` route reporting lifecycle status, uptime, the
//! instance id and the monitored-target count. Served on its own listener
//! and shut down through the same cancellation token as everything else.

use std::time::Instant;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use vigil_core::{ServiceStatus, StatusCell};

/// Shared state behind the health route.
#[derive(Clone)]
pub struct HealthState {
    status: StatusCell,
    instance_id: String,
    started_at: Instant,
    started_at_utc: chrono::DateTime<chrono::Utc>,
}

impl HealthState {
    /// Build health state for a service instance.
    pub fn new(
        status: StatusCell,
        instance_id: String,
        started_at_utc: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            status,
            instance_id,
            started_at: Instant::now(),
            started_at_utc,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: ServiceStatus,
    uptime_secs: u64,
    started_at: String,
    instance_id: String,
    monitored_targets: usize,
}

/// Build the health router.
pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.status.status(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        started_at: state.started_at_utc.to_rfc3339(),
        instance_id: state.instance_id.clone(),
        monitored_targets: state.status.monitored_targets(),
    })
}

/// Serve the health endpoint until cancelled.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: HealthState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

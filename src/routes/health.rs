// src/routes/health.rs
//! Liveness endpoint for the snapshot server.
//!
//! Reports whether a snapshot has been written and the reference date it
//! carries, so an uptime check can tell a stale pipeline from a dead server.
//! The server is up even before the first run; an unreadable snapshot is
//! reported as `degraded`.

use axum::{extract::State, routing::get, Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::OutputFiles;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    snapshot: bool,
    updated: Option<NaiveDate>,
}

/// Handle `GET /health`.
async fn health(State((snapshot, _)): State<OutputFiles>) -> Json<HealthResponse> {
    // ---
    let response = match snapshot.read() {
        Ok(Some(doc)) => HealthResponse {
            status: "ok",
            snapshot: true,
            updated: Some(doc.updated),
        },
        Ok(None) => HealthResponse {
            status: "ok",
            snapshot: false,
            updated: None,
        },
        Err(e) => {
            warn!("Health check could not read snapshot: {}", e);
            HealthResponse {
                status: "degraded",
                snapshot: snapshot.path().exists(),
                updated: None,
            }
        }
    };
    Json(response)
}

pub fn router() -> Router<OutputFiles> {
    Router::new().route("/health", get(health))
}

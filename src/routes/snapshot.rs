use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use tracing::{debug, error};

use super::OutputFiles;

/// Rows returned by `/history` when no limit is given.
const DEFAULT_HISTORY_LIMIT: usize = 30;

// ---

pub fn router() -> Router<OutputFiles> {
    // ---
    Router::new()
        .route("/snapshot", get(snapshot_handler))
        .route("/history", get(history_handler))
}

async fn snapshot_handler(State((snapshot, _)): State<OutputFiles>) -> impl IntoResponse {
    // ---
    debug!("GET /snapshot from {}", snapshot.path().display());

    match snapshot.read() {
        Ok(Some(doc)) => (StatusCode::OK, Json(doc)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json("No snapshot written yet")).into_response(),
        Err(e) => {
            error!("Failed to read snapshot: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to read snapshot"),
            )
                .into_response()
        }
    }
}

/// Query parameters for `/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

async fn history_handler(
    Query(params): Query<HistoryQuery>,
    State((_, history)): State<OutputFiles>,
) -> impl IntoResponse {
    // ---
    debug!("GET /history {:?}", params);

    match history.read_all() {
        Ok(Some(rows)) => {
            let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
            let start = rows.len().saturating_sub(limit);
            (StatusCode::OK, Json(rows[start..].to_vec())).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, Json("No history written yet")).into_response(),
        Err(e) => {
            error!("Failed to read history: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to read history"),
            )
                .into_response()
        }
    }
}

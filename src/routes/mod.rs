use axum::Router;

use crate::store::{HistoryStore, SnapshotWriter};

mod health;
mod snapshot;

// ---

/// Read-only state shared by the routes.
pub type OutputFiles = (SnapshotWriter, HistoryStore);

pub fn router(snapshot: SnapshotWriter, history: HistoryStore) -> Router {
    // ---
    Router::new()
        .merge(snapshot::router())
        .merge(health::router())
        .with_state((snapshot, history))
}

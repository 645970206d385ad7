//! Metadata discovery route.

use crate::handlers::metadata::metadata;
use crate::state::MetadataState;
use axum::{routing::get, Router};

/// GET and POST on `path`.
pub fn metadata_routes(path: &str, state: MetadataState) -> Router {
    Router::new()
        .route(path, get(metadata).post(metadata))
        .with_state(state)
}

//! Model CRUD routes. The first path segment is the registered model name.

use crate::handlers::entity::{bulk_create, create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:model", get(list).post(create))
        .route("/:model/bulk", post(bulk_create))
        .route(
            "/:model/:id",
            get(read).patch(update).put(update).delete(delete_handler),
        )
        .with_state(state)
}

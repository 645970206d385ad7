//! Routers for CRUD, metadata and service health.

mod common;
mod entity;
mod metadata;

pub use common::common_routes_with_ready;
pub use entity::entity_routes;
pub use metadata::metadata_routes;

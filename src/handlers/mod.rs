//! HTTP handlers for model CRUD and metadata discovery.

pub mod entity;
pub mod metadata;
pub use entity::*;
pub use metadata::*;

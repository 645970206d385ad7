//! ibird-mongoose: MongoDB model registry with generated REST routes, soft delete and schema discovery.

pub mod adapter;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod plugin;
pub mod registry;
pub mod response;
pub mod routes;
pub mod schema;
pub mod state;

pub use adapter::{DataAdapter, Getters, ListQuery, MemoryAdapter, MongoAdapter};
pub use config::{AppConfig, ConnectionOptions, ConnectionTarget};
pub use error::{AppError, ConfigError, RegistryError};
pub use plugin::{mount, MountOptions, Plugin, NAMESPACE};
pub use registry::{
    ModelDescriptor, ModelMetadata, ModelRegistry, RegisteredModel, RegistrationHooks, TombstoneSpec,
    DEFAULT_TOMBSTONE_KEY, MODEL_POST_EVENT, MODEL_PRE_EVENT,
};
pub use response::{errcode_body, success_many, success_one};
pub use routes::{common_routes_with_ready, entity_routes, metadata_routes};
pub use schema::{FieldDef, FieldKind, Schema};
pub use state::{AppState, LocaleFn, MetadataState};

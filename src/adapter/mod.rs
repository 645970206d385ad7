//! Data adapters: generic CRUD over registered models with tombstone semantics.

mod convert;
mod memory;
mod mongo;

pub use convert::{bson_to_json, document_to_json};
pub use memory::MemoryAdapter;
pub use mongo::MongoAdapter;

use crate::error::AppError;
use crate::registry::{Model, ModelRegistry};
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use serde_json::Value;
use std::sync::Arc;

/// Returns the registry served by the metadata route and consulted by the adapter.
pub type MetadataGetter = Arc<dyn Fn() -> Arc<ModelRegistry> + Send + Sync>;
/// Returns the soft-delete field of a model, if it has one.
pub type TombstoneKeyGetter = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;
/// Returns the persistence model registered under a name.
pub type ModelGetter = Arc<dyn Fn(&str) -> Option<Model> + Send + Sync>;

/// Lookup functions the adapter is built on. Each one can be replaced by the host.
#[derive(Clone)]
pub struct Getters {
    pub metadata: MetadataGetter,
    /// None when no model uses soft delete.
    pub tombstone_key: Option<TombstoneKeyGetter>,
    pub model: ModelGetter,
}

impl Getters {
    /// Defaults: the full registry, its tombstone map (only if non-empty), models by name.
    pub fn defaults(registry: Arc<ModelRegistry>) -> Self {
        let metadata: MetadataGetter = {
            let registry = registry.clone();
            Arc::new(move || registry.clone())
        };
        let tombstone_key: Option<TombstoneKeyGetter> = if registry.tombstone_keys().is_empty() {
            None
        } else {
            let registry = registry.clone();
            Some(Arc::new(move |name: &str| registry.tombstone_key(name).map(str::to_string)))
        };
        let model: ModelGetter = Arc::new(move |name: &str| registry.model(name));
        Getters {
            metadata,
            tombstone_key,
            model,
        }
    }

    pub fn tombstone_key_for(&self, name: &str) -> Option<String> {
        self.tombstone_key.as_ref().and_then(|get| get(name))
    }
}

/// List parameters: exact-match filters, one sort key, paging.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub filters: Vec<(String, Bson)>,
    /// Field and direction (1 ascending, -1 descending).
    pub sort: Option<(String, i32)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;
pub const BULK_LIMIT: usize = 100;

impl ListQuery {
    /// Always within `1..=MAX_LIMIT`; MongoDB reads a limit of 0 as unbounded.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// Storage operations behind the generated routes. Documents arrive validated and cast.
/// Tombstoned documents are invisible to every operation.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    fn getters(&self) -> &Getters;

    fn model(&self, name: &str) -> Option<Model> {
        (self.getters().model)(name)
    }

    fn tombstone_key(&self, name: &str) -> Option<String> {
        self.getters().tombstone_key_for(name)
    }

    async fn list(&self, model: &Model, query: &ListQuery) -> Result<Vec<Value>, AppError>;

    async fn read(&self, model: &Model, id: &ObjectId) -> Result<Option<Value>, AppError>;

    async fn create(&self, model: &Model, doc: Document) -> Result<Value, AppError>;

    async fn create_many(&self, model: &Model, docs: Vec<Document>) -> Result<Vec<Value>, AppError>;

    /// Apply `$set` of `changes`. None when the document does not exist (or is tombstoned).
    async fn update(&self, model: &Model, id: &ObjectId, changes: Document) -> Result<Option<Value>, AppError>;

    /// Set the tombstone flag when the model has one, otherwise remove the document. False when nothing matched.
    async fn delete(&self, model: &Model, id: &ObjectId) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Give the document an `_id` if it has none.
pub(crate) fn ensure_id(doc: &mut Document) -> ObjectId {
    match doc.get_object_id("_id") {
        Ok(id) => id,
        Err(_) => {
            let id = ObjectId::new();
            doc.insert("_id", id);
            id
        }
    }
}

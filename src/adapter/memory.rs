//! In-process adapter keeping documents per collection. Used by tests and database-less demos.

use crate::adapter::{document_to_json, ensure_id, DataAdapter, Getters, ListQuery, BULK_LIMIT};
use crate::error::AppError;
use crate::registry::Model;
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct MemoryAdapter {
    getters: Getters,
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryAdapter {
    pub fn new(getters: Getters) -> Self {
        MemoryAdapter {
            getters,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Raw stored documents of a collection, tombstoned ones included.
    pub fn raw_documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .map(|c| c.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn is_live(&self, model: &Model, doc: &Document) -> bool {
        match self.tombstone_key(model.name()) {
            Some(key) => !matches!(doc.get_bool(&key), Ok(true)),
            None => true,
        }
    }
}

fn lock_err() -> AppError {
    AppError::Internal("state lock poisoned".into())
}

fn has_id(doc: &Document, id: &ObjectId) -> bool {
    doc.get_object_id("_id").map(|d| d == *id).unwrap_or(false)
}

fn compare_bson(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (Some(Bson::ObjectId(x)), Some(Bson::ObjectId(y))) => x.cmp(y),
        (Some(Bson::Boolean(x)), Some(Bson::Boolean(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (x.as_f64().or(x.as_i64().map(|n| n as f64)), y.as_f64().or(y.as_i64().map(|n| n as f64))) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl DataAdapter for MemoryAdapter {
    fn getters(&self) -> &Getters {
        &self.getters
    }

    async fn list(&self, model: &Model, query: &ListQuery) -> Result<Vec<Value>, AppError> {
        let collections = self.collections.read().map_err(|_| lock_err())?;
        let mut docs: Vec<&Document> = collections
            .get(model.collection_name())
            .map(|docs| docs.iter().collect())
            .unwrap_or_default();
        docs.retain(|d| self.is_live(model, d) && query.filters.iter().all(|(k, v)| d.get(k) == Some(v)));
        match &query.sort {
            Some((field, dir)) => docs.sort_by(|a, b| {
                let ord = compare_bson(a.get(field), b.get(field));
                if *dir < 0 {
                    ord.reverse()
                } else {
                    ord
                }
            }),
            None => docs.sort_by(|a, b| compare_bson(a.get("_id"), b.get("_id"))),
        }
        Ok(docs
            .into_iter()
            .skip(query.effective_offset() as usize)
            .take(query.effective_limit() as usize)
            .map(|d| document_to_json(d.clone()))
            .collect())
    }

    async fn read(&self, model: &Model, id: &ObjectId) -> Result<Option<Value>, AppError> {
        let collections = self.collections.read().map_err(|_| lock_err())?;
        Ok(collections
            .get(model.collection_name())
            .and_then(|docs| docs.iter().find(|d| has_id(d, id) && self.is_live(model, d)))
            .map(|d| document_to_json(d.clone())))
    }

    async fn create(&self, model: &Model, mut doc: Document) -> Result<Value, AppError> {
        let id = ensure_id(&mut doc);
        let mut collections = self.collections.write().map_err(|_| lock_err())?;
        let docs = collections.entry(model.collection_name().to_string()).or_default();
        if docs.iter().any(|d| has_id(d, &id)) {
            return Err(AppError::BadRequest(format!("duplicate _id {}", id)));
        }
        docs.push(doc.clone());
        Ok(document_to_json(doc))
    }

    async fn create_many(&self, model: &Model, docs: Vec<Document>) -> Result<Vec<Value>, AppError> {
        if docs.len() > BULK_LIMIT {
            return Err(AppError::BadRequest(format!("bulk create limited to {} items", BULK_LIMIT)));
        }
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            out.push(self.create(model, doc).await?);
        }
        Ok(out)
    }

    async fn update(&self, model: &Model, id: &ObjectId, changes: Document) -> Result<Option<Value>, AppError> {
        let mut collections = self.collections.write().map_err(|_| lock_err())?;
        let found = collections
            .get_mut(model.collection_name())
            .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id) && self.is_live(model, d)));
        Ok(found.map(|doc| {
            for (k, v) in changes {
                doc.insert(k, v);
            }
            document_to_json(doc.clone())
        }))
    }

    async fn delete(&self, model: &Model, id: &ObjectId) -> Result<bool, AppError> {
        let tombstone = self.tombstone_key(model.name());
        let mut collections = self.collections.write().map_err(|_| lock_err())?;
        let Some(docs) = collections.get_mut(model.collection_name()) else {
            return Ok(false);
        };
        match tombstone {
            Some(key) => match docs.iter_mut().find(|d| has_id(d, id) && !matches!(d.get_bool(&key), Ok(true))) {
                Some(doc) => {
                    doc.insert(key, true);
                    Ok(true)
                }
                None => Ok(false),
            },
            None => {
                let before = docs.len();
                docs.retain(|d| !has_id(d, id));
                Ok(docs.len() < before)
            }
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

//! MongoDB-backed adapter.

use crate::adapter::{document_to_json, ensure_id, DataAdapter, Getters, ListQuery, BULK_LIMIT};
use crate::connection;
use crate::error::AppError;
use crate::registry::Model;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::Database;
use serde_json::Value;

pub struct MongoAdapter {
    database: Database,
    getters: Getters,
}

impl MongoAdapter {
    pub fn new(database: Database, getters: Getters) -> Self {
        MongoAdapter { database, getters }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Filter matching live documents only.
    fn live_filter(&self, model: &Model, mut filter: Document) -> Document {
        if let Some(key) = self.tombstone_key(model.name()) {
            filter.insert(key, doc! { "$ne": true });
        }
        filter
    }
}

#[async_trait]
impl DataAdapter for MongoAdapter {
    fn getters(&self) -> &Getters {
        &self.getters
    }

    async fn list(&self, model: &Model, query: &ListQuery) -> Result<Vec<Value>, AppError> {
        let mut filter = Document::new();
        for (k, v) in &query.filters {
            filter.insert(k.clone(), v.clone());
        }
        let filter = self.live_filter(model, filter);
        let sort = match &query.sort {
            Some((field, dir)) => doc! { field.as_str(): *dir },
            None => doc! { "_id": 1 },
        };
        tracing::debug!(collection = %model.collection_name(), filter = %filter, "find");
        let cursor = model
            .collection(&self.database)
            .find(filter)
            .sort(sort)
            .skip(query.effective_offset() as u64)
            .limit(query.effective_limit() as i64)
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(document_to_json).collect())
    }

    async fn read(&self, model: &Model, id: &ObjectId) -> Result<Option<Value>, AppError> {
        let filter = self.live_filter(model, doc! { "_id": *id });
        tracing::debug!(collection = %model.collection_name(), filter = %filter, "find_one");
        let found = model.collection(&self.database).find_one(filter).await?;
        Ok(found.map(document_to_json))
    }

    async fn create(&self, model: &Model, mut doc: Document) -> Result<Value, AppError> {
        ensure_id(&mut doc);
        tracing::debug!(collection = %model.collection_name(), "insert_one");
        model.collection(&self.database).insert_one(&doc).await?;
        Ok(document_to_json(doc))
    }

    async fn create_many(&self, model: &Model, mut docs: Vec<Document>) -> Result<Vec<Value>, AppError> {
        if docs.len() > BULK_LIMIT {
            return Err(AppError::BadRequest(format!("bulk create limited to {} items", BULK_LIMIT)));
        }
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        for doc in docs.iter_mut() {
            ensure_id(doc);
        }
        tracing::debug!(collection = %model.collection_name(), count = docs.len(), "insert_many");
        model.collection(&self.database).insert_many(&docs).await?;
        Ok(docs.into_iter().map(document_to_json).collect())
    }

    async fn update(&self, model: &Model, id: &ObjectId, changes: Document) -> Result<Option<Value>, AppError> {
        if changes.is_empty() {
            return self.read(model, id).await;
        }
        let filter = self.live_filter(model, doc! { "_id": *id });
        tracing::debug!(collection = %model.collection_name(), filter = %filter, "find_one_and_update");
        let updated = model
            .collection(&self.database)
            .find_one_and_update(filter, doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(document_to_json))
    }

    async fn delete(&self, model: &Model, id: &ObjectId) -> Result<bool, AppError> {
        let collection = model.collection(&self.database);
        match self.tombstone_key(model.name()) {
            Some(key) => {
                let filter = self.live_filter(model, doc! { "_id": *id });
                tracing::debug!(collection = %model.collection_name(), filter = %filter, "tombstone");
                let result = collection.update_one(filter, doc! { "$set": { key: true } }).await?;
                Ok(result.matched_count > 0)
            }
            None => {
                tracing::debug!(collection = %model.collection_name(), id = %id, "delete_one");
                let result = collection.delete_one(doc! { "_id": *id }).await?;
                Ok(result.deleted_count > 0)
            }
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        connection::ping(&self.database).await
    }
}

//! Persistence model: binds a schema to a MongoDB collection.

use crate::error::AppError;
use crate::schema::Schema;
use bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use std::sync::Arc;

/// Cheap to clone; holds no connection. Bind to a database per call.
#[derive(Clone, Debug)]
pub struct Model {
    name: String,
    collection_name: String,
    schema: Arc<Schema>,
}

impl Model {
    pub fn new(name: &str, schema: Arc<Schema>, collection: Option<&str>) -> Self {
        let collection_name = collection
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_collection_name(name));
        Model {
            name: name.to_string(),
            collection_name,
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn collection(&self, db: &Database) -> Collection<Document> {
        db.collection(&self.collection_name)
    }

    /// Index specs for fields flagged `unique` or `index`.
    pub fn index_models(&self) -> Vec<IndexModel> {
        self.schema
            .fields()
            .filter(|(_, def)| def.unique || def.index)
            .map(|(name, def)| {
                let options = IndexOptions::builder().unique(def.unique.then_some(true)).build();
                IndexModel::builder()
                    .keys(doc! { name: 1 })
                    .options(options)
                    .build()
            })
            .collect()
    }

    /// Create declared indexes. No-op when there are none.
    pub async fn init(&self, db: &Database) -> Result<(), AppError> {
        let indexes = self.index_models();
        if indexes.is_empty() {
            return Ok(());
        }
        tracing::debug!(model = %self.name, count = indexes.len(), "creating indexes");
        self.collection(db).create_indexes(indexes).await?;
        Ok(())
    }
}

/// Lowercased, pluralized collection name (`Category` -> `categories`, `Box` -> `boxes`).
pub fn default_collection_name(model_name: &str) -> String {
    let lower = model_name.to_lowercase();
    if lower.ends_with('s') {
        return lower;
    }
    if let Some(stem) = lower.strip_suffix('y') {
        let before = stem.chars().last();
        if before.map(|c| !"aeiou".contains(c)).unwrap_or(false) {
            return format!("{}ies", stem);
        }
    }
    if lower.ends_with('x') || lower.ends_with('z') || lower.ends_with("ch") || lower.ends_with("sh") {
        return format!("{}es", lower);
    }
    format!("{}s", lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldKind};

    #[test]
    fn pluralizes_collection_names() {
        assert_eq!(default_collection_name("User"), "users");
        assert_eq!(default_collection_name("Category"), "categories");
        assert_eq!(default_collection_name("Day"), "days");
        assert_eq!(default_collection_name("Box"), "boxes");
        assert_eq!(default_collection_name("Match"), "matches");
        assert_eq!(default_collection_name("News"), "news");
    }

    #[test]
    fn explicit_collection_wins() {
        let m = Model::new("User", Arc::new(Schema::new()), Some("accounts"));
        assert_eq!(m.collection_name(), "accounts");
        let m = Model::new("User", Arc::new(Schema::new()), Some("  "));
        assert_eq!(m.collection_name(), "users");
    }

    #[test]
    fn index_models_cover_unique_and_indexed_fields() {
        let mut indexed = FieldDef::new(FieldKind::String);
        indexed.index = true;
        let schema = Schema::new()
            .field("email", FieldDef::new(FieldKind::String).unique())
            .field("city", indexed)
            .field("bio", FieldDef::new(FieldKind::String));
        let m = Model::new("User", Arc::new(schema), None);
        let idx = m.index_models();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx[0].keys, doc! { "email": 1 });
        assert_eq!(idx[0].options.as_ref().and_then(|o| o.unique), Some(true));
        assert_eq!(idx[1].options.as_ref().and_then(|o| o.unique), None);
    }
}

//! Model descriptors as declared by callers, and the registered form kept in the registry.

use crate::registry::Model;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Tombstone field used when a model enables soft delete without naming the field.
pub const DEFAULT_TOMBSTONE_KEY: &str = "_dr";

/// `tombstoneKey` as declared: `true` for the default field, or a field name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TombstoneSpec {
    Enabled(bool),
    Key(String),
}

impl TombstoneSpec {
    /// Field name holding the flag, or None when soft delete is off.
    pub fn resolve(&self) -> Option<String> {
        match self {
            TombstoneSpec::Enabled(false) => None,
            TombstoneSpec::Enabled(true) => Some(DEFAULT_TOMBSTONE_KEY.to_string()),
            TombstoneSpec::Key(k) if k.trim().is_empty() => Some(DEFAULT_TOMBSTONE_KEY.to_string()),
            TombstoneSpec::Key(k) => Some(k.trim().to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub schema: Option<Schema>,
    /// Storage collection; defaults to the pluralized, lowercased name.
    #[serde(default)]
    pub collection: Option<String>,
    /// Skip index creation at start.
    #[serde(default)]
    pub skip_init: bool,
    #[serde(default)]
    pub tombstone_key: Option<TombstoneSpec>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        ModelDescriptor {
            name: name.into(),
            schema: Some(schema),
            ..Default::default()
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn skip_init(mut self) -> Self {
        self.skip_init = true;
        self
    }

    /// Soft delete through the default `_dr` field.
    pub fn tombstone(mut self) -> Self {
        self.tombstone_key = Some(TombstoneSpec::Enabled(true));
        self
    }

    pub fn tombstone_key(mut self, key: impl Into<String>) -> Self {
        self.tombstone_key = Some(TombstoneSpec::Key(key.into()));
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn resolved_tombstone_key(&self) -> Option<String> {
        self.tombstone_key.as_ref().and_then(TombstoneSpec::resolve)
    }
}

/// A model after registration: persistence handle, augmented schema, derived JSON Schema.
#[derive(Clone, Debug)]
pub struct RegisteredModel {
    pub name: String,
    pub display_name: Option<String>,
    pub skip_init: bool,
    pub tombstone_key: Option<String>,
    pub model: Model,
    pub raw_schema: Arc<Schema>,
    pub json_schema: Option<Value>,
}

/// Discovery entry served by the metadata route.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub name: String,
    pub display_name: String,
    pub json_schema: Value,
}

impl RegisteredModel {
    pub fn collection(&self) -> &str {
        self.model.collection_name()
    }

    /// None when no JSON Schema was derived. The display name falls back to the model name.
    pub fn metadata(&self) -> Option<ModelMetadata> {
        let json_schema = self.json_schema.clone()?;
        Some(ModelMetadata {
            name: self.name.clone(),
            display_name: self.display_name.clone().unwrap_or_else(|| self.name.clone()),
            json_schema,
        })
    }
}

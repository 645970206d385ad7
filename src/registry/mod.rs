//! Model registry: registration with tombstone augmentation, hooks and derived metadata.
//! Written during startup through `&mut`, then frozen into an `Arc` for request handlers.

mod descriptor;
mod loader;
mod model;

pub use descriptor::{ModelDescriptor, ModelMetadata, RegisteredModel, TombstoneSpec, DEFAULT_TOMBSTONE_KEY};
pub use loader::load_descriptors;
pub use model::{default_collection_name, Model};

use crate::error::RegistryError;
use crate::schema::{to_json_schema, FieldDef, FieldKind};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Label of the pre-registration hook point.
pub const MODEL_PRE_EVENT: &str = "ibird-mongoose:model:pre";
/// Label of the post-registration hook point.
pub const MODEL_POST_EVENT: &str = "ibird-mongoose:model:post";

pub type PreRegisterHook = Box<dyn Fn(&mut ModelDescriptor) + Send + Sync>;
pub type PostRegisterHook = Box<dyn Fn(&RegisteredModel) + Send + Sync>;

/// Callbacks run around each registration. Pre hooks may rewrite the descriptor.
#[derive(Default)]
pub struct RegistrationHooks {
    pre: Vec<PreRegisterHook>,
    post: Vec<PostRegisterHook>,
}

impl RegistrationHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pre<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut ModelDescriptor) + Send + Sync + 'static,
    {
        self.pre.push(Box::new(hook));
        self
    }

    pub fn on_post<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&RegisteredModel) + Send + Sync + 'static,
    {
        self.post.push(Box::new(hook));
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<RegisteredModel>>,
    tombstone_keys: HashMap<String, String>,
}

fn tombstone_field() -> FieldDef {
    FieldDef::new(FieldKind::Boolean).with_default(serde_json::Value::Bool(false))
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one model. On error the registry is unchanged.
    pub fn register(
        &mut self,
        mut descriptor: ModelDescriptor,
        hooks: &RegistrationHooks,
    ) -> Result<Arc<RegisteredModel>, RegistryError> {
        if descriptor.name.trim().is_empty() {
            return Err(RegistryError::MissingName);
        }
        if descriptor.schema.is_none() {
            return Err(RegistryError::MissingSchema {
                name: descriptor.name.clone(),
            });
        }
        if self.models.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate {
                name: descriptor.name.clone(),
            });
        }

        let injected = descriptor.resolved_tombstone_key();
        if let (Some(key), Some(schema)) = (&injected, descriptor.schema.as_mut()) {
            schema.add(key.clone(), tombstone_field());
        }

        tracing::debug!(event = MODEL_PRE_EVENT, model = %descriptor.name, "running pre-registration hooks");
        for hook in &hooks.pre {
            hook(&mut descriptor);
        }

        // Hooks may have changed the tombstone setting.
        let tombstone_key = descriptor.resolved_tombstone_key();
        if let Some(schema) = descriptor.schema.as_mut() {
            if let Some(old) = injected.as_ref().filter(|old| tombstone_key.as_ref() != Some(*old)) {
                if schema.get(old) == Some(&tombstone_field()) {
                    schema.remove(old);
                }
            }
            if let Some(key) = tombstone_key.as_ref().filter(|key| !schema.contains(key)) {
                schema.add(key.clone(), tombstone_field());
            }
        }

        // Hooks may have renamed the model or dropped its schema.
        let name = descriptor.name.clone();
        if name.trim().is_empty() {
            return Err(RegistryError::MissingName);
        }
        if self.models.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        let schema = descriptor
            .schema
            .take()
            .map(Arc::new)
            .ok_or_else(|| RegistryError::MissingSchema { name: name.clone() })?;

        let model = Model::new(&name, schema.clone(), descriptor.collection.as_deref());
        let json_schema = to_json_schema(&name, &schema);
        let registered = RegisteredModel {
            name: name.clone(),
            display_name: descriptor.display_name.take(),
            skip_init: descriptor.skip_init,
            tombstone_key: tombstone_key.clone(),
            model,
            raw_schema: schema,
            json_schema: Some(json_schema),
        };

        tracing::debug!(event = MODEL_POST_EVENT, model = %name, "running post-registration hooks");
        for hook in &hooks.post {
            hook(&registered);
        }

        if let Some(key) = tombstone_key {
            self.tombstone_keys.insert(name.clone(), key);
        }
        let registered = Arc::new(registered);
        self.models.insert(name.clone(), registered.clone());
        tracing::info!(
            model = %name,
            collection = %registered.collection(),
            tombstone = ?registered.tombstone_key,
            "model registered"
        );
        Ok(registered)
    }

    /// Register every descriptor found under `dir` (recursively). Returns the registered names.
    /// Stops at the first failure; models registered before it stay registered.
    pub fn register_dir(
        &mut self,
        dir: impl AsRef<Path>,
        hooks: &RegistrationHooks,
    ) -> Result<Vec<String>, RegistryError> {
        let mut names = Vec::new();
        for descriptor in load_descriptors(dir.as_ref())? {
            let registered = self.register(descriptor, hooks)?;
            names.push(registered.name.clone());
        }
        Ok(names)
    }

    /// Insert an already-built model, bypassing registration. Replaces any model with the same name.
    pub fn insert(&mut self, model: RegisteredModel) {
        match &model.tombstone_key {
            Some(key) => {
                self.tombstone_keys.insert(model.name.clone(), key.clone());
            }
            None => {
                self.tombstone_keys.remove(&model.name);
            }
        }
        self.models.insert(model.name.clone(), Arc::new(model));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredModel>> {
        self.models.get(name)
    }

    pub fn model(&self, name: &str) -> Option<Model> {
        self.models.get(name).map(|m| m.model.clone())
    }

    /// Registered models ordered by name.
    pub fn models(&self) -> impl Iterator<Item = &Arc<RegisteredModel>> {
        self.models.values()
    }

    pub fn tombstone_key(&self, name: &str) -> Option<&str> {
        self.tombstone_keys.get(name).map(String::as_str)
    }

    pub fn tombstone_keys(&self) -> &HashMap<String, String> {
        &self.tombstone_keys
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// End of startup: share read-only.
    pub fn freeze(self) -> Arc<ModelRegistry> {
        Arc::new(self)
    }
}

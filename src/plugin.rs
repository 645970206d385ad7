//! Host integration: connect on load, collect models, mount routes on play.

use crate::adapter::{DataAdapter, Getters, MetadataGetter, ModelGetter, MongoAdapter, TombstoneKeyGetter};
use crate::config::{AppConfig, DEFAULT_ROUTE_PREFIX};
use crate::connection;
use crate::error::{AppError, RegistryError};
use crate::registry::{ModelDescriptor, ModelRegistry, RegisteredModel, RegistrationHooks};
use crate::routes::{common_routes_with_ready, entity_routes, metadata_routes};
use crate::state::{AppState, LocaleFn, MetadataState};
use axum::Router;
use mongodb::Database;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

pub const NAMESPACE: &str = "ibird-mongoose";

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Route mounting settings. Getter overrides replace the registry-backed defaults.
#[derive(Clone, Default)]
pub struct MountOptions {
    pub route_prefix: Option<String>,
    pub metadata_path: Option<String>,
    pub locale: Option<LocaleFn>,
    pub metadata_getter: Option<MetadataGetter>,
    pub tombstone_key_getter: Option<TombstoneKeyGetter>,
    pub model_getter: Option<ModelGetter>,
}

impl MountOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        MountOptions {
            route_prefix: Some(config.default_route_prefix.clone()),
            metadata_path: config.metadata_path.clone(),
            ..Default::default()
        }
    }

    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(prefix.into());
        self
    }

    pub fn metadata_path(mut self, path: impl Into<String>) -> Self {
        self.metadata_path = Some(path.into());
        self
    }

    pub fn locale<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.locale = Some(Arc::new(f));
        self
    }

    pub fn metadata_getter<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Arc<ModelRegistry> + Send + Sync + 'static,
    {
        self.metadata_getter = Some(Arc::new(f));
        self
    }

    pub fn tombstone_key_getter<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.tombstone_key_getter = Some(Arc::new(f));
        self
    }

    pub fn model_getter<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<crate::registry::Model> + Send + Sync + 'static,
    {
        self.model_getter = Some(Arc::new(f));
        self
    }

    /// Registry-backed defaults with any overrides applied.
    pub fn getters(&self, registry: Arc<ModelRegistry>) -> Getters {
        let mut getters = Getters::defaults(registry);
        if let Some(g) = &self.metadata_getter {
            getters.metadata = g.clone();
        }
        if let Some(g) = &self.tombstone_key_getter {
            getters.tombstone_key = Some(g.clone());
        }
        if let Some(g) = &self.model_getter {
            getters.model = g.clone();
        }
        getters
    }
}

/// `/api/` -> `/api`; empty or `/` -> None (mount at root).
fn normalize_prefix(prefix: Option<&str>) -> Option<String> {
    let p = prefix.unwrap_or(DEFAULT_ROUTE_PREFIX).trim().trim_end_matches('/');
    if p.is_empty() {
        return None;
    }
    Some(if p.starts_with('/') { p.to_string() } else { format!("/{}", p) })
}

/// Build the router: CRUD under the prefix, metadata route if configured, health/readiness.
pub fn mount(adapter: Arc<dyn DataAdapter>, options: &MountOptions) -> Router {
    let state = AppState { adapter };
    let crud = entity_routes(state.clone()).layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
    let mut router = match normalize_prefix(options.route_prefix.as_deref()) {
        Some(prefix) => {
            tracing::info!(prefix = %prefix, "mounting model routes");
            Router::new().nest(&prefix, crud)
        }
        None => {
            tracing::info!("mounting model routes at root");
            crud
        }
    };
    if let Some(path) = options.metadata_path.as_deref().filter(|p| !p.trim().is_empty()) {
        let meta_state = MetadataState {
            metadata: state.adapter.getters().metadata.clone(),
            locale: options.locale.clone(),
        };
        tracing::info!(path = %path, "mounting metadata route");
        router = router.merge(metadata_routes(path, meta_state));
    }
    router.merge(common_routes_with_ready(state))
}

/// One instance per application. Models are registered between `on_load` and `on_play`.
pub struct Plugin {
    database: Database,
    registry: ModelRegistry,
    hooks: RegistrationHooks,
    /// `model_dir` from config, registered in `on_play` once hooks are attached.
    configured_dir: Option<PathBuf>,
}

impl Plugin {
    /// Connect to MongoDB. The configured model directory is registered later, in `on_play`.
    pub async fn on_load(config: &AppConfig) -> Result<Self, AppError> {
        let database = connection::connect(&config.mongo).await?;
        let mut plugin = Plugin::with_database(database);
        plugin.configured_dir = config.model_dir.clone();
        Ok(plugin)
    }

    pub fn with_database(database: Database) -> Self {
        Plugin {
            database,
            registry: ModelRegistry::new(),
            hooks: RegistrationHooks::new(),
            configured_dir: None,
        }
    }

    pub fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn on_pre_register<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut ModelDescriptor) + Send + Sync + 'static,
    {
        self.hooks.on_pre(hook);
        self
    }

    pub fn on_post_register<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&RegisteredModel) + Send + Sync + 'static,
    {
        self.hooks.on_post(hook);
        self
    }

    pub fn model(&mut self, descriptor: ModelDescriptor) -> Result<Arc<RegisteredModel>, RegistryError> {
        self.registry.register(descriptor, &self.hooks)
    }

    pub fn model_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<String>, RegistryError> {
        self.registry.register_dir(dir, &self.hooks)
    }

    /// Register the configured model directory, create indexes (unless `skipInit`),
    /// freeze the registry and build the router.
    pub async fn on_play(mut self, options: MountOptions) -> Result<Router, AppError> {
        if let Some(dir) = self.configured_dir.take() {
            let names = self.registry.register_dir(&dir, &self.hooks)?;
            tracing::info!(count = names.len(), dir = %dir.display(), "registered configured models");
        }
        for registered in self.registry.models() {
            if registered.skip_init {
                tracing::debug!(model = %registered.name, "skipping index init");
                continue;
            }
            registered.model.init(&self.database).await?;
        }
        let registry = self.registry.freeze();
        let getters = options.getters(registry);
        let adapter: Arc<dyn DataAdapter> = Arc::new(MongoAdapter::new(self.database, getters));
        Ok(mount(adapter, &options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::{options::ClientOptions, Client};
    use std::sync::Mutex;

    #[test]
    fn normalizes_route_prefix() {
        assert_eq!(normalize_prefix(None).as_deref(), Some("/api"));
        assert_eq!(normalize_prefix(Some("/v1/")).as_deref(), Some("/v1"));
        assert_eq!(normalize_prefix(Some("rest")).as_deref(), Some("/rest"));
        assert_eq!(normalize_prefix(Some("/")), None);
        assert_eq!(normalize_prefix(Some("")), None);
    }

    #[tokio::test]
    async fn configured_model_dir_runs_through_hooks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tag.json"),
            r#"{ "name": "Tag", "skipInit": true, "schema": { "label": "String" } }"#,
        )
        .unwrap();
        // Client construction does not contact the server.
        let options = ClientOptions::parse("mongodb://localhost:27017").await.unwrap();
        let database = Client::with_options(options).unwrap().database("plugin_test");

        let mut plugin = Plugin::with_database(database);
        plugin.configured_dir = Some(dir.path().to_path_buf());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            plugin.on_pre_register(move |d| seen.lock().unwrap().push(format!("pre:{}", d.name)));
        }
        {
            let seen = seen.clone();
            plugin.on_post_register(move |m| seen.lock().unwrap().push(format!("post:{}", m.name)));
        }

        plugin.on_play(MountOptions::default()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["pre:Tag", "post:Tag"]);
    }
}

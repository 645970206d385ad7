//! Load host configuration from a JSON file or from environment variables.

use crate::config::{AppConfig, ConnectionTarget};
use crate::error::ConfigError;
use std::path::Path;

pub const ENV_MONGO_URL: &str = "MONGO_URL";
pub const ENV_ROUTE_PREFIX: &str = "ROUTE_PREFIX";
pub const ENV_METADATA_PATH: &str = "METADATA_PATH";
pub const ENV_MODEL_DIR: &str = "MODEL_DIR";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

impl AppConfig {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
    }

    /// From `MONGO_URL` (required), `ROUTE_PREFIX`, `METADATA_PATH`, `MODEL_DIR`, `BIND_ADDR`.
    /// A `MONGO_URL` starting with `{` is parsed as a `{ uri, opts }` descriptor.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mongo_raw = var(ENV_MONGO_URL).ok_or(ConfigError::Missing(ENV_MONGO_URL))?;
        let mongo = if mongo_raw.starts_with('{') {
            serde_json::from_str(&mongo_raw).map_err(|e| ConfigError::Connection(e.to_string()))?
        } else {
            ConnectionTarget::Uri(mongo_raw)
        };
        let mut config = AppConfig::new(mongo);
        if let Some(prefix) = var(ENV_ROUTE_PREFIX) {
            config.default_route_prefix = prefix;
        }
        config.metadata_path = var(ENV_METADATA_PATH);
        config.model_dir = var(ENV_MODEL_DIR).map(Into::into);
        if let Some(addr) = var(ENV_BIND_ADDR) {
            config.bind_addr = addr;
        }
        Ok(config)
    }
}

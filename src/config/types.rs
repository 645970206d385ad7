//! Host configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ROUTE_PREFIX: &str = "/api";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Driver options applied on connect. Unset fields keep the driver defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    /// Database to use; falls back to the default database in the URI.
    #[serde(default)]
    pub db_name: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub min_pool_size: Option<u32>,
    #[serde(default)]
    pub max_pool_size: Option<u32>,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default)]
    pub server_selection_timeout_ms: Option<u64>,
}

impl ConnectionOptions {
    /// Option set used when the target is a bare connection string.
    pub fn defaults() -> Self {
        ConnectionOptions {
            db_name: None,
            app_name: Some("ibird-mongoose".to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            connect_timeout_ms: Some(10_000),
            server_selection_timeout_ms: Some(30_000),
        }
    }
}

/// `mongo` setting: a connection string or `{ "uri": ..., "opts": { ... } }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionTarget {
    Uri(String),
    Descriptor {
        uri: String,
        #[serde(default)]
        opts: ConnectionOptions,
    },
}

impl ConnectionTarget {
    /// Descriptor form; a bare string gets the default option set.
    pub fn normalize(&self) -> (String, ConnectionOptions) {
        match self {
            ConnectionTarget::Uri(uri) => (uri.clone(), ConnectionOptions::defaults()),
            ConnectionTarget::Descriptor { uri, opts } => (uri.clone(), opts.clone()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub mongo: ConnectionTarget,
    #[serde(default = "default_route_prefix")]
    pub default_route_prefix: String,
    /// Path of the metadata route; the route is not mounted when unset.
    #[serde(default)]
    pub metadata_path: Option<String>,
    /// Directory of model descriptor files registered on load.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_route_prefix() -> String {
    DEFAULT_ROUTE_PREFIX.to_string()
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl AppConfig {
    pub fn new(mongo: ConnectionTarget) -> Self {
        AppConfig {
            mongo,
            default_route_prefix: default_route_prefix(),
            metadata_path: None,
            model_dir: None,
            bind_addr: default_bind_addr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_target_gets_default_options() {
        let target: ConnectionTarget = serde_json::from_value(json!("mongodb://localhost/blog")).unwrap();
        let (uri, opts) = target.normalize();
        assert_eq!(uri, "mongodb://localhost/blog");
        assert_eq!(opts, ConnectionOptions::defaults());
    }

    #[test]
    fn descriptor_target_keeps_its_options() {
        let target: ConnectionTarget = serde_json::from_value(json!({
            "uri": "mongodb://db:27017",
            "opts": { "dbName": "blog", "maxPoolSize": 4 }
        }))
        .unwrap();
        let (uri, opts) = target.normalize();
        assert_eq!(uri, "mongodb://db:27017");
        assert_eq!(opts.db_name.as_deref(), Some("blog"));
        assert_eq!(opts.max_pool_size, Some(4));
        assert_eq!(opts.app_name, None);
    }

    #[test]
    fn app_config_defaults() {
        let cfg: AppConfig = serde_json::from_value(json!({ "mongo": "mongodb://localhost/blog" })).unwrap();
        assert_eq!(cfg.default_route_prefix, "/api");
        assert_eq!(cfg.metadata_path, None);
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
    }
}

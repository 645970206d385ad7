//! Shared state for the generated routes. Built once at start; read-only afterwards.

use crate::adapter::{DataAdapter, MetadataGetter};
use std::sync::Arc;

/// Localizes a message key. None when the key has no translation.
pub type LocaleFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<dyn DataAdapter>,
}

#[derive(Clone)]
pub struct MetadataState {
    pub metadata: MetadataGetter,
    pub locale: Option<LocaleFn>,
}

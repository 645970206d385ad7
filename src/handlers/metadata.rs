//! Metadata discovery: display name and JSON Schema of registered models.

use crate::error::AppError;
use crate::registry::ModelMetadata;
use crate::response::{errcode_body, SuccessOne};
use crate::state::MetadataState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

/// Locale key of the unknown-model message. `{name}` is replaced by the requested name.
pub const MODEL_NOT_FOUND_KEY: &str = "model_not_found";

#[derive(Debug, Default, Deserialize)]
pub struct NameParam {
    #[serde(default)]
    pub name: Option<String>,
}

/// GET `?name=` or POST `{ "name": ... }`. The query string wins when both are present.
pub async fn metadata(
    State(state): State<MetadataState>,
    Query(query): Query<NameParam>,
    body: Option<Json<NameParam>>,
) -> Response {
    let name = query
        .name
        .or_else(|| body.and_then(|Json(b)| b.name))
        .filter(|n| !n.trim().is_empty());
    let registry = (state.metadata)();

    match name {
        Some(name) => match registry.get(&name).and_then(|m| m.metadata()) {
            Some(meta) => Json(SuccessOne { data: meta, meta: None }).into_response(),
            None => {
                let err = AppError::NotFound(format!("model {}", name));
                let errmsg = state
                    .locale
                    .as_ref()
                    .and_then(|localize| localize(MODEL_NOT_FOUND_KEY))
                    .map(|template| template.replace("{name}", &name))
                    .unwrap_or_else(|| err.to_string());
                tracing::debug!(model = %name, "metadata requested for unknown model");
                Json(errcode_body(500, errmsg, format!("{:?}", err))).into_response()
            }
        },
        None => {
            let all: Vec<ModelMetadata> = registry.models().filter_map(|m| m.metadata()).collect();
            Json(SuccessOne { data: all, meta: None }).into_response()
        }
    }
}

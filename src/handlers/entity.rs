//! Model CRUD handlers: list, create, bulk create, read, update, delete.

use crate::adapter::ListQuery;
use crate::error::AppError;
use crate::registry::Model;
use crate::response::{success_many, success_many_created, success_one, success_one_ok};
use crate::schema::{query_value_for_field, DocumentValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bson::{oid::ObjectId, Bson};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn model_for(state: &AppState, name: &str) -> Result<Model, AppError> {
    state
        .adapter
        .model(name)
        .ok_or_else(|| AppError::NotFound(format!("model {}", name)))
}

fn parse_id(id_str: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id_str).map_err(|_| AppError::BadRequest("invalid id".into()))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// The tombstone flag is only written by delete.
fn reject_tombstone_field(state: &AppState, model: &Model, body: &Map<String, Value>) -> Result<(), AppError> {
    match state.adapter.tombstone_key(model.name()) {
        Some(key) if body.contains_key(&key) => Err(AppError::Validation(format!("{} cannot be set directly", key))),
        _ => Ok(()),
    }
}

/// `sort=field` ascending, `sort=-field` descending. Only schema fields and `_id`.
fn parse_sort(model: &Model, raw: &str) -> Result<(String, i32), AppError> {
    let (field, dir) = match raw.strip_prefix('-') {
        Some(f) => (f, -1),
        None => (raw.strip_prefix('+').unwrap_or(raw), 1),
    };
    if field != "_id" && !model.schema().contains(field) {
        return Err(AppError::BadRequest(format!("cannot sort by {}", field)));
    }
    Ok((field.to_string(), dir))
}

fn list_query(model: &Model, params: HashMap<String, String>) -> Result<ListQuery, AppError> {
    let mut query = ListQuery::default();
    for (k, v) in params {
        match k.as_str() {
            "limit" => query.limit = v.parse().ok(),
            "offset" => query.offset = v.parse().ok(),
            "sort" => query.sort = Some(parse_sort(model, &v)?),
            "_id" => query.filters.push((k, Bson::ObjectId(parse_id(&v)?))),
            _ => {
                if let Some(def) = model.schema().get(&k) {
                    let val = query_value_for_field(def, &v);
                    query.filters.push((k, val));
                }
            }
        }
    }
    Ok(query)
}

pub async fn list(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let model = model_for(&state, &model_name)?;
    let query = list_query(&model, params)?;
    let rows = state.adapter.list(&model, &query).await?;
    Ok(success_many(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let model = model_for(&state, &model_name)?;
    let body = body_to_map(body)?;
    reject_tombstone_field(&state, &model, &body)?;
    let doc = DocumentValidator::validate_create(model.schema(), &body)?;
    let row = state.adapter.create(&model, doc).await?;
    Ok(success_one(row))
}

pub async fn bulk_create(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let model = model_for(&state, &model_name)?;
    let items = match body {
        Value::Array(arr) => arr,
        _ => return Err(AppError::BadRequest("body must be a JSON array".into())),
    };
    let mut docs = Vec::with_capacity(items.len());
    for item in items {
        let item = body_to_map(item)?;
        reject_tombstone_field(&state, &model, &item)?;
        docs.push(DocumentValidator::validate_create(model.schema(), &item)?);
    }
    let rows = state.adapter.create_many(&model, docs).await?;
    Ok(success_many_created(rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((model_name, id_str)): Path<(String, String)>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let model = model_for(&state, &model_name)?;
    let id = parse_id(&id_str)?;
    let row = state
        .adapter
        .read(&model, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((model_name, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let model = model_for(&state, &model_name)?;
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    reject_tombstone_field(&state, &model, &body)?;
    let changes = DocumentValidator::validate_update(model.schema(), &body)?;
    let row = state
        .adapter
        .update(&model, &id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((model_name, id_str)): Path<(String, String)>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let model = model_for(&state, &model_name)?;
    let id = parse_id(&id_str)?;
    if !state.adapter.delete(&model, &id).await? {
        return Err(AppError::NotFound(id_str));
    }
    Ok(StatusCode::NO_CONTENT)
}

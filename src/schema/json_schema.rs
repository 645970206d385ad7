//! JSON Schema derivation for registered models.

use crate::schema::{FieldDef, FieldKind, Schema};
use serde_json::{json, Map, Value};

pub const OBJECT_ID_PATTERN: &str = "^[0-9a-fA-F]{24}$";

/// Derive a draft-07 style object schema. `_id` is always listed.
pub fn to_json_schema(title: &str, schema: &Schema) -> Value {
    let mut properties = Map::new();
    properties.insert("_id".into(), kind_schema(&FieldKind::ObjectId));
    let mut required = Vec::new();
    for (name, def) in schema.fields() {
        properties.insert(name.to_string(), field_schema(def));
        if def.required {
            required.push(Value::String(name.to_string()));
        }
    }
    let mut out = Map::new();
    out.insert("title".into(), Value::String(title.to_string()));
    out.insert("type".into(), Value::String("object".into()));
    out.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        out.insert("required".into(), Value::Array(required));
    }
    Value::Object(out)
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::String => json!({ "type": "string" }),
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Integer => json!({ "type": "integer" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Date => json!({ "type": "string", "format": "date-time" }),
        FieldKind::ObjectId => json!({ "type": "string", "pattern": OBJECT_ID_PATTERN }),
        FieldKind::Array(inner) => json!({ "type": "array", "items": kind_schema(inner) }),
        FieldKind::Object | FieldKind::Mixed => json!({ "type": "object" }),
    }
}

fn field_schema(def: &FieldDef) -> Value {
    let mut out = match kind_schema(&def.kind) {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    if let Some(values) = &def.enum_values {
        out.insert("enum".into(), Value::Array(values.clone()));
    }
    if let Some(min) = def.min {
        out.insert("minimum".into(), json!(min));
    }
    if let Some(max) = def.max {
        out.insert("maximum".into(), json!(max));
    }
    if let Some(n) = def.min_length {
        out.insert("minLength".into(), json!(n));
    }
    if let Some(n) = def.max_length {
        out.insert("maxLength".into(), json!(n));
    }
    if let Some(p) = &def.pattern {
        out.insert("pattern".into(), Value::String(p.clone()));
    }
    if let Some(d) = &def.default {
        out.insert("default".into(), d.clone());
    }
    if let Some(r) = &def.reference {
        out.insert("x-ref".into(), Value::String(r.clone()));
    }
    if let Some(desc) = &def.description {
        out.insert("description".into(), Value::String(desc.clone()));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_types_and_constraints() {
        let schema = Schema::from_json(&json!({
            "title": { "type": "String", "required": true, "maxlength": 120 },
            "status": { "type": "String", "enum": ["draft", "published"], "default": "draft" },
            "rating": { "type": "Number", "min": 1, "max": 5 },
            "publishedAt": "Date",
            "tags": ["String"]
        }))
        .unwrap();

        let js = to_json_schema("Article", &schema);
        assert_eq!(js["title"], "Article");
        assert_eq!(js["type"], "object");
        assert_eq!(js["required"], json!(["title"]));
        let props = &js["properties"];
        assert_eq!(props["_id"]["pattern"], OBJECT_ID_PATTERN);
        assert_eq!(props["title"], json!({ "type": "string", "maxLength": 120 }));
        assert_eq!(props["status"]["enum"], json!(["draft", "published"]));
        assert_eq!(props["status"]["default"], "draft");
        assert_eq!(props["rating"]["minimum"], json!(1.0));
        assert_eq!(props["publishedAt"], json!({ "type": "string", "format": "date-time" }));
        assert_eq!(props["tags"], json!({ "type": "array", "items": { "type": "string" } }));
    }

    #[test]
    fn omits_required_when_nothing_is_required() {
        let schema = Schema::from_json(&json!({ "note": "String" })).unwrap();
        let js = to_json_schema("Note", &schema);
        assert!(js.get("required").is_none());
    }
}

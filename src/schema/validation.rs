//! Document validation and casting from schema rules.

use crate::error::AppError;
use crate::schema::{FieldDef, FieldKind, Schema};
use bson::{oid::ObjectId, Bson, Document};
use regex::Regex;
use serde_json::{Map, Value};

pub struct DocumentValidator;

impl DocumentValidator {
    /// Validate a new document: defaults for absent fields, required fields present, every field cast.
    pub fn validate_create(schema: &Schema, body: &Map<String, Value>) -> Result<Document, AppError> {
        reject_unknown(schema, body)?;
        let mut doc = Document::new();
        if let Some(id) = body.get("_id") {
            doc.insert("_id", cast_object_id("_id", id)?);
        }
        for (name, def) in schema.fields() {
            let val = body.get(name).or(def.default.as_ref());
            match val {
                None | Some(Value::Null) if def.required => {
                    return Err(AppError::Validation(format!("{} is required", name)));
                }
                None => {}
                Some(v) => {
                    doc.insert(name, validate_field(name, v, def)?);
                }
            }
        }
        Ok(doc)
    }

    /// Validate only the fields present in body (for PATCH). Required is enforced only against explicit nulls.
    pub fn validate_update(schema: &Schema, body: &Map<String, Value>) -> Result<Document, AppError> {
        if body.contains_key("_id") {
            return Err(AppError::Validation("_id cannot be changed".into()));
        }
        reject_unknown(schema, body)?;
        let mut doc = Document::new();
        for (name, v) in body {
            if let Some(def) = schema.get(name) {
                if def.required && v.is_null() {
                    return Err(AppError::Validation(format!("{} is required", name)));
                }
                doc.insert(name.clone(), validate_field(name, v, def)?);
            }
        }
        Ok(doc)
    }
}

fn reject_unknown(schema: &Schema, body: &Map<String, Value>) -> Result<(), AppError> {
    for key in body.keys() {
        if key != "_id" && !schema.contains(key) {
            return Err(AppError::Validation(format!("{} is not a field of this model", key)));
        }
    }
    Ok(())
}

/// Casts, then checks constraints against the cast value.
fn validate_field(name: &str, v: &Value, def: &FieldDef) -> Result<Bson, AppError> {
    if v.is_null() {
        return Ok(Bson::Null);
    }
    let cast = cast_kind(name, v, &def.kind)?;
    match (&def.kind, &cast) {
        (FieldKind::Array(inner), Bson::Array(items)) => {
            for item in items.iter().filter(|item| !matches!(item, Bson::Null)) {
                check_constraints(name, item, inner, def)?;
            }
        }
        (kind, value) => check_constraints(name, value, kind, def)?,
    }
    Ok(cast)
}

fn check_constraints(name: &str, v: &Bson, kind: &FieldKind, def: &FieldDef) -> Result<(), AppError> {
    if let Some(allowed) = &def.enum_values {
        let matched = allowed
            .iter()
            .any(|a| cast_kind(name, a, kind).map(|a| bson_eq(v, &a)).unwrap_or(false));
        if !matched {
            let shown: Vec<String> = allowed.iter().take(5).map(Value::to_string).collect();
            return Err(AppError::Validation(format!("{} must be one of: {}", name, shown.join(", "))));
        }
    }
    if let Bson::String(s) = v {
        let len = s.chars().count();
        if let Some(max) = def.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!("{} must be at most {} characters", name, max)));
            }
        }
        if let Some(min) = def.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!("{} must be at least {} characters", name, min)));
            }
        }
        if let Some(pattern) = &def.pattern {
            let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", name)))?;
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", name)));
            }
        }
    }
    if let Some(n) = numeric(v) {
        if let Some(min) = def.min {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", name, min)));
            }
        }
        if let Some(max) = def.max {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", name, max)));
            }
        }
    }
    Ok(())
}

fn numeric(v: &Bson) -> Option<f64> {
    match v {
        Bson::Double(d) => Some(*d),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Int32(n) => Some(f64::from(*n)),
        _ => None,
    }
}

fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn invalid(name: &str, expected: &str) -> AppError {
    AppError::Validation(format!("{} must be {}", name, expected))
}

fn cast_kind(name: &str, v: &Value, kind: &FieldKind) -> Result<Bson, AppError> {
    match kind {
        FieldKind::String => match v {
            Value::String(s) => Ok(Bson::String(s.clone())),
            Value::Number(n) => Ok(Bson::String(n.to_string())),
            Value::Bool(b) => Ok(Bson::String(b.to_string())),
            _ => Err(invalid(name, "a string")),
        },
        FieldKind::Number => match v {
            Value::Number(n) => n.as_f64().map(Bson::Double).ok_or_else(|| invalid(name, "a number")),
            Value::String(s) => s.trim().parse::<f64>().map(Bson::Double).map_err(|_| invalid(name, "a number")),
            _ => Err(invalid(name, "a number")),
        },
        FieldKind::Integer => match v {
            Value::Number(n) => n.as_i64().map(Bson::Int64).ok_or_else(|| invalid(name, "an integer")),
            Value::String(s) => s.trim().parse::<i64>().map(Bson::Int64).map_err(|_| invalid(name, "an integer")),
            _ => Err(invalid(name, "an integer")),
        },
        FieldKind::Boolean => match v {
            Value::Bool(b) => Ok(Bson::Boolean(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Bson::Boolean(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Bson::Boolean(false)),
            _ => Err(invalid(name, "a boolean")),
        },
        FieldKind::Date => cast_date(name, v),
        FieldKind::ObjectId => cast_object_id(name, v),
        FieldKind::Array(inner) => match v {
            Value::Array(items) => items
                .iter()
                .map(|item| if item.is_null() { Ok(Bson::Null) } else { cast_kind(name, item, inner) })
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            _ => Err(invalid(name, "an array")),
        },
        FieldKind::Object => match v {
            Value::Object(_) => Ok(bson::to_bson(v)?),
            _ => Err(invalid(name, "an object")),
        },
        FieldKind::Mixed => Ok(bson::to_bson(v)?),
    }
}

fn cast_date(name: &str, v: &Value) -> Result<Bson, AppError> {
    match v {
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|d| Bson::DateTime(bson::DateTime::from_chrono(d.with_timezone(&chrono::Utc))))
            .map_err(|_| invalid(name, "an RFC 3339 date")),
        Value::Number(n) => n
            .as_i64()
            .map(|ms| Bson::DateTime(bson::DateTime::from_millis(ms)))
            .ok_or_else(|| invalid(name, "a date")),
        _ => Err(invalid(name, "a date")),
    }
}

fn cast_object_id(name: &str, v: &Value) -> Result<Bson, AppError> {
    v.as_str()
        .and_then(|s| ObjectId::parse_str(s).ok())
        .map(Bson::ObjectId)
        .ok_or_else(|| invalid(name, "a 24 character hex id"))
}

/// Cast a query-string value for an exact-match filter. Falls back to the raw string when the cast fails.
pub fn query_value_for_field(def: &FieldDef, s: &str) -> Bson {
    let kind = match &def.kind {
        FieldKind::Array(inner) => inner.as_ref(),
        other => other,
    };
    match kind {
        FieldKind::Number => {
            if let Ok(n) = s.parse::<f64>() {
                return Bson::Double(n);
            }
        }
        FieldKind::Integer => {
            if let Ok(n) = s.parse::<i64>() {
                return Bson::Int64(n);
            }
        }
        FieldKind::Boolean => {
            if s.eq_ignore_ascii_case("true") {
                return Bson::Boolean(true);
            }
            if s.eq_ignore_ascii_case("false") {
                return Bson::Boolean(false);
            }
        }
        FieldKind::ObjectId => {
            if let Ok(id) = ObjectId::parse_str(s) {
                return Bson::ObjectId(id);
            }
        }
        FieldKind::Date => {
            if let Ok(d) = chrono::DateTime::parse_from_rfc3339(s) {
                return Bson::DateTime(bson::DateTime::from_chrono(d.with_timezone(&chrono::Utc)));
            }
        }
        _ => {}
    }
    Bson::String(s.to_string())
}

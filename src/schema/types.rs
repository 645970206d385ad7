//! Model schema: ordered field definitions parsed from a mongoose-like JSON shorthand.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Storage type of a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    ObjectId,
    Array(Box<FieldKind>),
    Object,
    Mixed,
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(FieldKind::String),
            "number" | "double" | "decimal" => Ok(FieldKind::Number),
            "integer" | "int" => Ok(FieldKind::Integer),
            "boolean" | "bool" => Ok(FieldKind::Boolean),
            "date" => Ok(FieldKind::Date),
            "objectid" | "object_id" => Ok(FieldKind::ObjectId),
            "object" | "map" => Ok(FieldKind::Object),
            "mixed" | "any" => Ok(FieldKind::Mixed),
            "array" => Ok(FieldKind::Array(Box::new(FieldKind::Mixed))),
            other => Err(format!("unknown field type '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    /// Regex the string value must match (`match` in the shorthand).
    pub pattern: Option<String>,
    pub unique: bool,
    pub index: bool,
    /// Name of the referenced model for ObjectId fields.
    pub reference: Option<String>,
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(kind: FieldKind) -> Self {
        FieldDef {
            kind,
            required: false,
            default: None,
            enum_values: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            pattern: None,
            unique: false,
            index: false,
            reference: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Parse one field definition: `"String"`, `["String"]` or `{ "type": ..., ... }`.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(FieldDef::new(s.parse()?)),
            Value::Array(items) => Ok(FieldDef::new(array_kind(items)?)),
            Value::Object(obj) => match obj.get("type") {
                Some(t) => field_from_object(t, obj),
                // Nested path without a type: stored as a sub-document.
                None => Ok(FieldDef::new(FieldKind::Object)),
            },
            other => Err(format!(
                "field definition must be a string, array or object; got {}",
                type_name_of_json(other)
            )),
        }
    }
}

fn array_kind(items: &[Value]) -> Result<FieldKind, String> {
    let inner = match items.first() {
        Some(v) => FieldDef::from_json(v)?.kind,
        None => FieldKind::Mixed,
    };
    Ok(FieldKind::Array(Box::new(inner)))
}

fn field_from_object(type_value: &Value, obj: &Map<String, Value>) -> Result<FieldDef, String> {
    let kind = match type_value {
        Value::String(s) => s.parse()?,
        Value::Array(items) => array_kind(items)?,
        other => return Err(format!("field type must be a string or array; got {}", type_name_of_json(other))),
    };
    let mut def = FieldDef::new(kind);
    def.required = obj.get("required").and_then(Value::as_bool).unwrap_or(false);
    def.default = obj.get("default").cloned();
    def.enum_values = match obj.get("enum") {
        Some(Value::Array(values)) => Some(values.clone()),
        Some(other) => return Err(format!("enum must be an array; got {}", type_name_of_json(other))),
        None => None,
    };
    def.min = obj.get("min").and_then(Value::as_f64);
    def.max = obj.get("max").and_then(Value::as_f64);
    def.min_length = length_option(obj, "minlength", "minLength");
    def.max_length = length_option(obj, "maxlength", "maxLength");
    def.pattern = obj
        .get("match")
        .or_else(|| obj.get("pattern"))
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(p) = &def.pattern {
        regex::Regex::new(p).map_err(|e| format!("invalid pattern '{}': {}", p, e))?;
    }
    def.unique = obj.get("unique").and_then(Value::as_bool).unwrap_or(false);
    def.index = obj.get("index").and_then(Value::as_bool).unwrap_or(false);
    def.reference = obj.get("ref").and_then(Value::as_str).map(str::to_string);
    def.description = obj.get("description").and_then(Value::as_str).map(str::to_string);
    Ok(def)
}

fn length_option(obj: &Map<String, Value>, lower: &str, camel: &str) -> Option<u32> {
    obj.get(lower)
        .or_else(|| obj.get(camel))
        .and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
}

pub(crate) fn type_name_of_json(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ordered set of named fields. Declaration order is kept for schema output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldDef)>,
}

impl Schema {
    pub fn new() -> Self {
        Schema { fields: Vec::new() }
    }

    /// Insert a field, replacing an existing definition with the same name in place.
    pub fn add(&mut self, name: impl Into<String>, def: FieldDef) -> &mut Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = def,
            None => self.fields.push((name, def)),
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldDef> {
        let pos = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.add(name, def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn from_json(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("schema must be an object; got {}", type_name_of_json(value)))?;
        let mut schema = Schema::new();
        for (name, def) in obj {
            let def = FieldDef::from_json(def).map_err(|e| format!("{}: {}", name, e))?;
            schema.add(name.clone(), def);
        }
        Ok(schema)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        Schema::from_json(&v).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_shorthand_and_long_form() {
        let schema: Schema = serde_json::from_value(json!({
            "title": "String",
            "views": { "type": "Number", "min": 0, "default": 0 },
            "tags": ["String"],
            "author": { "type": "ObjectId", "ref": "User", "required": true },
            "meta": { "source": "String" }
        }))
        .unwrap();

        assert_eq!(schema.len(), 5);
        assert_eq!(schema.get("title").unwrap().kind, FieldKind::String);
        let views = schema.get("views").unwrap();
        assert_eq!(views.min, Some(0.0));
        assert_eq!(views.default, Some(json!(0)));
        assert_eq!(
            schema.get("tags").unwrap().kind,
            FieldKind::Array(Box::new(FieldKind::String))
        );
        let author = schema.get("author").unwrap();
        assert!(author.required);
        assert_eq!(author.reference.as_deref(), Some("User"));
        assert_eq!(schema.get("meta").unwrap().kind, FieldKind::Object);
    }

    #[test]
    fn keeps_declaration_order() {
        let schema: Schema = serde_json::from_value(json!({ "b": "String", "a": "Number", "c": "Date" })).unwrap();
        let names: Vec<&str> = schema.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = serde_json::from_value::<Schema>(json!({ "x": "Blob" })).unwrap_err();
        assert!(err.to_string().contains("unknown field type"));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let err = Schema::from_json(&json!({ "code": { "type": "String", "match": "([a-z" } })).unwrap_err();
        assert!(err.starts_with("code: invalid pattern"));
    }

    #[test]
    fn add_replaces_existing_field() {
        let mut schema = Schema::new().field("flag", FieldDef::new(FieldKind::String));
        schema.add("flag", FieldDef::new(FieldKind::Boolean));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("flag").unwrap().kind, FieldKind::Boolean);
    }
}

//! BSON to API JSON. ObjectIds become hex strings and dates RFC 3339 strings.

use bson::{Bson, Document};
use serde_json::{Map, Value};

pub fn document_to_json(doc: Document) -> Value {
    let mut map = Map::new();
    for (k, v) in doc {
        map.insert(k, bson_to_json(v));
    }
    Value::Object(map)
}

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::Number(n.into()),
        Bson::Int64(n) => Value::Number(n.into()),
        Bson::Double(n) => serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(d) => Value::String(d.to_chrono().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => document_to_json(doc),
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn flattens_ids_and_dates() {
        let id = ObjectId::parse_str("65f1a2b3c4d5e6f708091a2b").unwrap();
        let when = bson::DateTime::from_millis(1_709_287_200_000);
        let v = document_to_json(doc! {
            "_id": id,
            "at": when,
            "n": 3_i64,
            "score": 1.5,
            "tags": ["a", "b"],
            "nested": { "ok": true },
            "gone": Bson::Null,
        });
        assert_eq!(
            v,
            json!({
                "_id": "65f1a2b3c4d5e6f708091a2b",
                "at": "2024-03-01T10:00:00.000Z",
                "n": 3,
                "score": 1.5,
                "tags": ["a", "b"],
                "nested": { "ok": true },
                "gone": null
            })
        );
    }
}

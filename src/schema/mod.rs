//! Model schemas: field definitions, JSON Schema derivation, document validation.

mod json_schema;
mod types;
mod validation;

pub use json_schema::{to_json_schema, OBJECT_ID_PATTERN};
pub use types::{FieldDef, FieldKind, Schema};
pub use validation::{query_value_for_field, DocumentValidator};

//! Structural JSON validation.
//!
//! The engine only needs `validate(json, schema)`; [`StructuralValidator`]
//! understands the subset of JSON Schema used by token list schemas:
//! `type`, `required`, `properties`, `items`, `enum` and `minItems`.
//! Unknown keywords are ignored.

use serde_json::Value;

use crate::errors::SchemaError;

/// Schema every manifest must satisfy.
pub const MANIFEST_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "title": "Token list manifest",
    "type": "object",
    "required": ["timestamp", "version", "tokenLists"],
    "properties": {
        "timestamp": {"type": "string"},
        "version": {
            "type": "object",
            "required": ["major", "minor", "patch"],
            "properties": {
                "major": {"type": "integer"},
                "minor": {"type": "integer"},
                "patch": {"type": "integer"}
            }
        },
        "tokenLists": {
            "type": "array",
            "items": {
                "type": "object",
                "required": ["id", "sourceUrl"],
                "properties": {
                    "id": {"type": "string"},
                    "sourceUrl": {"type": "string"},
                    "schema": {"type": "string"}
                }
            }
        }
    }
}"#;

pub trait SchemaValidator: Send + Sync {
    fn validate(&self, json: &[u8], schema: &[u8]) -> Result<(), SchemaError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl SchemaValidator for StructuralValidator {
    fn validate(&self, json: &[u8], schema: &[u8]) -> Result<(), SchemaError> {
        let schema: Value = serde_json::from_slice(schema)
            .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;
        if !schema.is_object() {
            return Err(SchemaError::InvalidSchema("schema root must be an object".into()));
        }
        let document: Value = serde_json::from_slice(json)?;
        check(&document, &schema, "$")
    }
}

fn type_matches(value: &Value, ty: &str) -> bool {
    match ty {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn violation(path: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::Violation {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn check(value: &Value, schema: &Value, path: &str) -> Result<(), SchemaError> {
    let Some(rules) = schema.as_object() else {
        // `true`/`false` schemas and anything exotic are accepted.
        return Ok(());
    };

    match rules.get("type") {
        Some(Value::String(ty)) if !type_matches(value, ty) => {
            return Err(violation(path, format!("expected {}", ty)));
        }
        Some(Value::Array(types)) => {
            let ok = types
                .iter()
                .filter_map(Value::as_str)
                .any(|ty| type_matches(value, ty));
            if !ok {
                return Err(violation(path, format!("expected one of {}", Value::Array(types.clone()))));
            }
        }
        _ => {}
    }

    if let Some(Value::Array(allowed)) = rules.get("enum") {
        if !allowed.contains(value) {
            return Err(violation(path, "value not in enum"));
        }
    }

    if let Value::Object(fields) = value {
        if let Some(Value::Array(required)) = rules.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !fields.contains_key(name) {
                    return Err(violation(path, format!("missing required property {:?}", name)));
                }
            }
        }
        if let Some(Value::Object(properties)) = rules.get("properties") {
            for (name, sub_schema) in properties {
                if let Some(field) = fields.get(name) {
                    check(field, sub_schema, &format!("{}.{}", path, name))?;
                }
            }
        }
    }

    if let Value::Array(items) = value {
        if let Some(min) = rules.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                return Err(violation(path, format!("expected at least {} items", min)));
            }
        }
        if let Some(item_schema) = rules.get("items") {
            for (i, item) in items.iter().enumerate() {
                check(item, item_schema, &format!("{}[{}]", path, i))?;
            }
        }
    }

    Ok(())
}

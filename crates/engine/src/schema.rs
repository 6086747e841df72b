//! Structural validation of incoming schema documents.
//!
//! Checks shape and size only; semantic validation of the schema language is
//! out of scope. All problems are collected before returning so the caller
//! can report them together.

use serde_json::Value;

use crate::error::{EngineError, Result};

/// Caps applied to incoming schema documents.
#[derive(Debug, Clone, Copy)]
pub struct SchemaLimits {
    /// Maximum serialized size in bytes.
    pub max_bytes: usize,
    /// Maximum number of top-level properties.
    pub max_properties: usize,
}

impl Default for SchemaLimits {
    fn default() -> Self {
        Self {
            max_bytes: 1_000_000,
            max_properties: 1000,
        }
    }
}

/// Validate a schema document against structural expectations and `limits`.
pub fn validate_schema(schema: &Value, limits: &SchemaLimits) -> Result<()> {
    let mut problems = Vec::new();

    let Some(root) = schema.as_object() else {
        return Err(EngineError::InvalidSchema(vec![
            "schema document must be a JSON object".to_string(),
        ]));
    };

    let serialized_len = serde_json::to_string(schema).map(|s| s.len()).unwrap_or(0);
    if serialized_len > limits.max_bytes {
        problems.push(format!(
            "schema too large: {serialized_len} bytes exceeds the {} byte cap",
            limits.max_bytes
        ));
    }

    if let Some(type_value) = root.get("type") {
        let valid = match type_value {
            Value::String(_) => true,
            Value::Array(entries) => entries.iter().all(Value::is_string),
            _ => false,
        };
        if !valid {
            problems.push("'type' must be a string or a list of strings".to_string());
        }
    }

    match root.get("properties") {
        None => {}
        Some(Value::Object(props)) => {
            if props.len() > limits.max_properties {
                problems.push(format!(
                    "too many top-level properties: {} exceeds the cap of {}",
                    props.len(),
                    limits.max_properties
                ));
            }
        }
        Some(_) => problems.push("'properties' must be an object".to_string()),
    }

    match root.get("required") {
        None => {}
        Some(Value::Array(entries)) => {
            if !entries.iter().all(Value::is_string) {
                problems.push("'required' entries must be strings".to_string());
            }
        }
        Some(_) => problems.push("'required' must be a list of property names".to_string()),
    }

    if let Some(items) = root.get("items") {
        if !items.is_object() {
            problems.push("'items' must be a schema object".to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(EngineError::InvalidSchema(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_object_schema() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "required": ["id"]
        });
        assert!(validate_schema(&schema, &SchemaLimits::default()).is_ok());
    }

    #[test]
    fn test_non_object_document_rejected() {
        let err = validate_schema(&json!([1, 2, 3]), &SchemaLimits::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSchema(_)));
    }

    #[test]
    fn test_property_cap_enforced() {
        let mut props = serde_json::Map::new();
        for i in 0..5 {
            props.insert(format!("col_{i}"), json!({"type": "string"}));
        }
        let schema = json!({"type": "object", "properties": props});
        let limits = SchemaLimits {
            max_bytes: 1_000_000,
            max_properties: 3,
        };

        let err = validate_schema(&schema, &limits).unwrap_err();
        let EngineError::InvalidSchema(problems) = err else {
            panic!("expected InvalidSchema");
        };
        assert!(problems[0].contains("too many top-level properties"));
    }

    #[test]
    fn test_size_cap_enforced() {
        let schema = json!({
            "type": "object",
            "properties": {"blob": {"type": "string", "description": "x".repeat(512)}}
        });
        let limits = SchemaLimits {
            max_bytes: 100,
            max_properties: 1000,
        };
        assert!(validate_schema(&schema, &limits).is_err());
    }

    #[test]
    fn test_all_problems_collected() {
        let schema = json!({
            "type": 42,
            "properties": ["not", "an", "object"],
            "required": "id"
        });
        let err = validate_schema(&schema, &SchemaLimits::default()).unwrap_err();
        let EngineError::InvalidSchema(problems) = err else {
            panic!("expected InvalidSchema");
        };
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn test_nullable_type_list_accepted() {
        let schema = json!({
            "type": "object",
            "properties": {"email": {"type": ["string", "null"]}}
        });
        assert!(validate_schema(&schema, &SchemaLimits::default()).is_ok());
    }
}

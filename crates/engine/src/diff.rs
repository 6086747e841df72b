//! Structural schema diffing.
//!
//! Compares two JSON-Schema-shaped documents and emits a flat, ordered list
//! of typed change records. The walk is depth-first and alphabetical at each
//! level, so the output is deterministic for a given input pair. Unknown
//! subtrees are compared structurally and never abort the walk.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic-version classification of a whole diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Patch,
    Minor,
    Major,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Patch => "patch",
            ChangeType::Minor => "minor",
            ChangeType::Major => "major",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of structural change kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    PropertyAdded,
    PropertyRemoved,
    RequiredAdded,
    RequiredRemoved,
    TypeChanged,
    EnumNarrowed,
    EnumWidened,
    FormatChanged,
    ItemsChanged,
    NestedObjectChanged,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::PropertyAdded => "property_added",
            ChangeKind::PropertyRemoved => "property_removed",
            ChangeKind::RequiredAdded => "required_added",
            ChangeKind::RequiredRemoved => "required_removed",
            ChangeKind::TypeChanged => "type_changed",
            ChangeKind::EnumNarrowed => "enum_narrowed",
            ChangeKind::EnumWidened => "enum_widened",
            ChangeKind::FormatChanged => "format_changed",
            ChangeKind::ItemsChanged => "items_changed",
            ChangeKind::NestedObjectChanged => "nested_object_changed",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural difference between two schema documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    /// JSON Pointer to the affected node.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    pub message: String,
}

impl ChangeRecord {
    fn new(kind: ChangeKind, path: String, message: String) -> Self {
        Self {
            kind,
            path,
            old: None,
            new: None,
            message,
        }
    }

    fn with_values(mut self, old: Option<Value>, new: Option<Value>) -> Self {
        self.old = old;
        self.new = new;
        self
    }
}

/// Result of diffing two schemas: the ordered change records and the derived
/// overall change type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub changes: Vec<ChangeRecord>,
    pub change_type: ChangeType,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compare two schema documents and derive the overall change type.
pub fn diff_schemas(old: &Value, new: &Value) -> SchemaDiff {
    let mut changes = Vec::new();
    walk(old, new, "", &mut changes);
    let change_type = classify(&changes);
    SchemaDiff {
        changes,
        change_type,
    }
}

fn classify(changes: &[ChangeRecord]) -> ChangeType {
    let major = changes.iter().any(|c| {
        matches!(
            c.kind,
            ChangeKind::PropertyRemoved
                | ChangeKind::RequiredAdded
                | ChangeKind::TypeChanged
                | ChangeKind::EnumNarrowed
                | ChangeKind::FormatChanged
        )
    });
    if major {
        return ChangeType::Major;
    }
    let minor = changes
        .iter()
        .any(|c| matches!(c.kind, ChangeKind::PropertyAdded | ChangeKind::EnumWidened));
    if minor {
        ChangeType::Minor
    } else {
        ChangeType::Patch
    }
}

/// Normalized view of a node's `type` keyword.
///
/// Lists are reduced to their non-null members so `["string", "null"]`
/// compares equal to `"string"`; nullability alone is not a type change.
fn normalized_type(node: &Value) -> Option<String> {
    match node.get("type") {
        Some(Value::String(s)) => {
            if s == "null" {
                None
            } else {
                Some(s.clone())
            }
        }
        Some(Value::Array(entries)) => {
            let mut names: Vec<&str> = entries
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| *s != "null")
                .collect();
            names.sort_unstable();
            names.dedup();
            if names.is_empty() {
                None
            } else {
                Some(names.join("|"))
            }
        }
        _ => None,
    }
}

fn is_object_schema(node: &Value) -> bool {
    normalized_type(node).as_deref() == Some("object")
        || node.get("properties").map_or(false, Value::is_object)
}

fn enum_values(node: &Value) -> Option<BTreeSet<String>> {
    node.get("enum").and_then(Value::as_array).map(|entries| {
        entries
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    })
}

fn required_names(node: &Value) -> BTreeSet<String> {
    node.get("required")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn property_names(node: &Value) -> BTreeSet<String> {
    node.get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default()
}

fn walk(old: &Value, new: &Value, path: &str, out: &mut Vec<ChangeRecord>) {
    diff_type(old, new, path, out);
    diff_format(old, new, path, out);
    diff_enum(old, new, path, out);
    diff_required(old, new, path, out);
    diff_properties(old, new, path, out);
    diff_items(old, new, path, out);
}

fn diff_type(old: &Value, new: &Value, path: &str, out: &mut Vec<ChangeRecord>) {
    let old_type = normalized_type(old);
    let new_type = normalized_type(new);
    if old_type != new_type && old_type.is_some() && new_type.is_some() {
        let record = ChangeRecord::new(
            ChangeKind::TypeChanged,
            path.to_string(),
            format!(
                "type changed from '{}' to '{}'",
                old_type.as_deref().unwrap_or("any"),
                new_type.as_deref().unwrap_or("any"),
            ),
        )
        .with_values(old.get("type").cloned(), new.get("type").cloned());
        out.push(record);
    }
}

fn diff_format(old: &Value, new: &Value, path: &str, out: &mut Vec<ChangeRecord>) {
    let old_format = old.get("format").and_then(Value::as_str);
    let new_format = new.get("format").and_then(Value::as_str);
    if old_format != new_format && (old_format.is_some() || new_format.is_some()) {
        let record = ChangeRecord::new(
            ChangeKind::FormatChanged,
            path.to_string(),
            format!(
                "format changed from '{}' to '{}'",
                old_format.unwrap_or("none"),
                new_format.unwrap_or("none"),
            ),
        )
        .with_values(old.get("format").cloned(), new.get("format").cloned());
        out.push(record);
    }
}

fn diff_enum(old: &Value, new: &Value, path: &str, out: &mut Vec<ChangeRecord>) {
    let old_enum = enum_values(old);
    let new_enum = enum_values(new);
    match (old_enum, new_enum) {
        (Some(old_set), Some(new_set)) => {
            let removed: Vec<&String> = old_set.difference(&new_set).collect();
            let added: Vec<&String> = new_set.difference(&old_set).collect();
            if !removed.is_empty() {
                let record = ChangeRecord::new(
                    ChangeKind::EnumNarrowed,
                    path.to_string(),
                    format!(
                        "enum no longer accepts: {}",
                        removed
                            .iter()
                            .map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
                .with_values(old.get("enum").cloned(), new.get("enum").cloned());
                out.push(record);
            }
            if !added.is_empty() {
                let record = ChangeRecord::new(
                    ChangeKind::EnumWidened,
                    path.to_string(),
                    format!(
                        "enum now also accepts: {}",
                        added
                            .iter()
                            .map(|s| s.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
                .with_values(old.get("enum").cloned(), new.get("enum").cloned());
                out.push(record);
            }
        }
        // Introducing an enum restricts the accepted values; dropping one
        // lifts the restriction.
        (None, Some(_)) => {
            let record = ChangeRecord::new(
                ChangeKind::EnumNarrowed,
                path.to_string(),
                "enum constraint introduced".to_string(),
            )
            .with_values(None, new.get("enum").cloned());
            out.push(record);
        }
        (Some(_), None) => {
            let record = ChangeRecord::new(
                ChangeKind::EnumWidened,
                path.to_string(),
                "enum constraint removed".to_string(),
            )
            .with_values(old.get("enum").cloned(), None);
            out.push(record);
        }
        (None, None) => {}
    }
}

fn diff_required(old: &Value, new: &Value, path: &str, out: &mut Vec<ChangeRecord>) {
    let old_required = required_names(old);
    let new_required = required_names(new);

    for name in new_required.difference(&old_required) {
        out.push(ChangeRecord::new(
            ChangeKind::RequiredAdded,
            format!("{path}/required/{name}"),
            format!("'{name}' is now required"),
        ));
    }
    for name in old_required.difference(&new_required) {
        out.push(ChangeRecord::new(
            ChangeKind::RequiredRemoved,
            format!("{path}/required/{name}"),
            format!("'{name}' is no longer required"),
        ));
    }
}

fn diff_properties(old: &Value, new: &Value, path: &str, out: &mut Vec<ChangeRecord>) {
    let old_names = property_names(old);
    let new_names = property_names(new);
    if old_names.is_empty() && new_names.is_empty() {
        return;
    }

    // BTreeSet union iterates alphabetically, which fixes record order.
    for name in old_names.union(&new_names) {
        let child_path = format!("{path}/properties/{name}");
        let old_child = old.get("properties").and_then(|p| p.get(name));
        let new_child = new.get("properties").and_then(|p| p.get(name));
        match (old_child, new_child) {
            (None, Some(added)) => {
                out.push(
                    ChangeRecord::new(
                        ChangeKind::PropertyAdded,
                        child_path,
                        format!("property '{name}' added"),
                    )
                    .with_values(None, Some(added.clone())),
                );
            }
            (Some(removed), None) => {
                out.push(
                    ChangeRecord::new(
                        ChangeKind::PropertyRemoved,
                        child_path,
                        format!("property '{name}' removed"),
                    )
                    .with_values(Some(removed.clone()), None),
                );
            }
            (Some(old_child), Some(new_child)) => {
                let mut sub = Vec::new();
                walk(old_child, new_child, &child_path, &mut sub);
                if !sub.is_empty() && is_object_schema(old_child) && is_object_schema(new_child) {
                    out.push(ChangeRecord::new(
                        ChangeKind::NestedObjectChanged,
                        child_path,
                        format!("nested object '{name}' changed"),
                    ));
                }
                out.append(&mut sub);
            }
            (None, None) => {}
        }
    }
}

fn diff_items(old: &Value, new: &Value, path: &str, out: &mut Vec<ChangeRecord>) {
    let old_items = old.get("items").filter(|v| v.is_object());
    let new_items = new.get("items").filter(|v| v.is_object());
    if let (Some(old_items), Some(new_items)) = (old_items, new_items) {
        let items_path = format!("{path}/items");
        let mut sub = Vec::new();
        walk(old_items, new_items, &items_path, &mut sub);
        if !sub.is_empty() {
            out.push(ChangeRecord::new(
                ChangeKind::ItemsChanged,
                items_path,
                "array item schema changed".to_string(),
            ));
            out.append(&mut sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer_id": {"type": "integer"},
                "email": {"type": "string"}
            },
            "required": ["customer_id", "email"]
        })
    }

    #[test]
    fn test_identical_schemas_produce_empty_diff() {
        let schema = customer_schema();
        let diff = diff_schemas(&schema, &schema);
        assert!(diff.is_empty());
        assert_eq!(diff.change_type, ChangeType::Patch);
    }

    #[test]
    fn test_optional_property_added_is_minor() {
        let old = customer_schema();
        let mut new = customer_schema();
        new["properties"]["loyalty_tier"] = json!({
            "type": "string",
            "enum": ["bronze", "silver", "gold"]
        });

        let diff = diff_schemas(&old, &new);
        assert_eq!(diff.change_type, ChangeType::Minor);
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].kind, ChangeKind::PropertyAdded);
        assert_eq!(diff.changes[0].path, "/properties/loyalty_tier");
    }

    #[test]
    fn test_property_removed_is_major() {
        let old = customer_schema();
        let new = json!({
            "type": "object",
            "properties": {"customer_id": {"type": "integer"}},
            "required": ["customer_id"]
        });

        let diff = diff_schemas(&old, &new);
        assert_eq!(diff.change_type, ChangeType::Major);
        let kinds: Vec<ChangeKind> = diff.changes.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ChangeKind::PropertyRemoved));
        assert!(kinds.contains(&ChangeKind::RequiredRemoved));
        let removed = diff
            .changes
            .iter()
            .find(|c| c.kind == ChangeKind::PropertyRemoved)
            .unwrap();
        assert_eq!(removed.path, "/properties/email");
        let unrequired = diff
            .changes
            .iter()
            .find(|c| c.kind == ChangeKind::RequiredRemoved)
            .unwrap();
        assert_eq!(unrequired.path, "/required/email");
    }

    #[test]
    fn test_required_added_is_major() {
        let old = customer_schema();
        let mut new = customer_schema();
        new["properties"]["region"] = json!({"type": "string"});
        new["required"] = json!(["customer_id", "email", "region"]);

        let diff = diff_schemas(&old, &new);
        assert_eq!(diff.change_type, ChangeType::Major);
        let kinds: Vec<ChangeKind> = diff.changes.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ChangeKind::RequiredAdded));
        assert!(kinds.contains(&ChangeKind::PropertyAdded));
    }

    #[test]
    fn test_type_change_is_major() {
        let old = customer_schema();
        let mut new = customer_schema();
        new["properties"]["customer_id"] = json!({"type": "string"});

        let diff = diff_schemas(&old, &new);
        assert_eq!(diff.change_type, ChangeType::Major);
        assert_eq!(diff.changes[0].kind, ChangeKind::TypeChanged);
        assert_eq!(diff.changes[0].path, "/properties/customer_id");
    }

    #[test]
    fn test_nullable_type_list_is_not_a_type_change() {
        let old = json!({"type": "object", "properties": {"email": {"type": "string"}}});
        let new = json!({"type": "object", "properties": {"email": {"type": ["string", "null"]}}});

        let diff = diff_schemas(&old, &new);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_enum_narrowed_and_widened() {
        let old = json!({"type": "string", "enum": ["a", "b", "c"]});
        let narrowed = json!({"type": "string", "enum": ["a", "b"]});
        let widened = json!({"type": "string", "enum": ["a", "b", "c", "d"]});

        let diff = diff_schemas(&old, &narrowed);
        assert_eq!(diff.changes[0].kind, ChangeKind::EnumNarrowed);
        assert_eq!(diff.change_type, ChangeType::Major);

        let diff = diff_schemas(&old, &widened);
        assert_eq!(diff.changes[0].kind, ChangeKind::EnumWidened);
        assert_eq!(diff.change_type, ChangeType::Minor);
    }

    #[test]
    fn test_format_change_is_major() {
        let old = json!({"type": "string", "format": "date"});
        let new = json!({"type": "string", "format": "date-time"});

        let diff = diff_schemas(&old, &new);
        assert_eq!(diff.changes[0].kind, ChangeKind::FormatChanged);
        assert_eq!(diff.change_type, ChangeType::Major);
    }

    #[test]
    fn test_items_recursion_marks_items_changed() {
        let old = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        });
        let new = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "integer"}}
            }
        });

        let diff = diff_schemas(&old, &new);
        let kinds: Vec<ChangeKind> = diff.changes.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::ItemsChanged, ChangeKind::TypeChanged]);
        assert_eq!(diff.changes[1].path, "/properties/tags/items");
    }

    #[test]
    fn test_nested_object_recursion() {
        let old = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": {"city": {"type": "string"}}
                }
            }
        });
        let new = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": {
                        "city": {"type": "string"},
                        "zip": {"type": "string"}
                    }
                }
            }
        });

        let diff = diff_schemas(&old, &new);
        let kinds: Vec<ChangeKind> = diff.changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::NestedObjectChanged, ChangeKind::PropertyAdded]
        );
        assert_eq!(diff.changes[1].path, "/properties/address/properties/zip");
    }

    #[test]
    fn test_diff_is_deterministic() {
        let old = customer_schema();
        let new = json!({
            "type": "object",
            "properties": {
                "zeta": {"type": "string"},
                "alpha": {"type": "integer"},
                "customer_id": {"type": "integer"}
            },
            "required": ["customer_id"]
        });

        let first = serde_json::to_string(&diff_schemas(&old, &new)).unwrap();
        for _ in 0..10 {
            let again = serde_json::to_string(&diff_schemas(&old, &new)).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_diff_paths_are_symmetric_with_dual_kinds() {
        let a = customer_schema();
        let mut b = customer_schema();
        b["properties"]["loyalty_tier"] = json!({"type": "string"});
        b["required"] = json!(["customer_id"]);

        let forward = diff_schemas(&a, &b);
        let reverse = diff_schemas(&b, &a);

        let mut forward_paths: Vec<&str> =
            forward.changes.iter().map(|c| c.path.as_str()).collect();
        let mut reverse_paths: Vec<&str> =
            reverse.changes.iter().map(|c| c.path.as_str()).collect();
        forward_paths.sort_unstable();
        reverse_paths.sort_unstable();
        assert_eq!(forward_paths, reverse_paths);

        let added = forward
            .changes
            .iter()
            .find(|c| c.path == "/properties/loyalty_tier")
            .unwrap();
        let dual = reverse
            .changes
            .iter()
            .find(|c| c.path == "/properties/loyalty_tier")
            .unwrap();
        assert_eq!(added.kind, ChangeKind::PropertyAdded);
        assert_eq!(dual.kind, ChangeKind::PropertyRemoved);
    }

    #[test]
    fn test_unknown_subtrees_are_tolerated() {
        let old = json!({"type": "object", "x-vendor": {"weird": [1, 2]}});
        let new = json!({"type": "object", "x-vendor": {"weird": [3]}});

        // Unknown keywords are not diffed; the documents compare clean.
        let diff = diff_schemas(&old, &new);
        assert!(diff.is_empty());
    }
}

//! Compatibility classification.
//!
//! Filters a [`SchemaDiff`] down to the changes that are breaking under a
//! given compatibility mode. The classifier never re-walks the schemas.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::diff::{ChangeKind, ChangeRecord, SchemaDiff};

/// Compatibility policy for a contract, borrowed from schema registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityMode {
    /// New readers must handle old data.
    Backward,
    /// Old readers must handle new data.
    Forward,
    /// Both directions.
    Full,
    /// Never breaking; changes are informational only.
    None,
}

impl CompatibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityMode::Backward => "backward",
            CompatibilityMode::Forward => "forward",
            CompatibilityMode::Full => "full",
            CompatibilityMode::None => "none",
        }
    }
}

impl std::fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The changes in `diff` that are breaking under `mode`, in diff order.
pub fn breaking_changes(diff: &SchemaDiff, mode: CompatibilityMode) -> Vec<ChangeRecord> {
    match mode {
        CompatibilityMode::None => Vec::new(),
        CompatibilityMode::Backward => diff
            .changes
            .iter()
            .filter(|c| breaks_backward(c.kind))
            .cloned()
            .collect(),
        CompatibilityMode::Forward => {
            let required = newly_required_paths(diff);
            diff.changes
                .iter()
                .filter(|c| breaks_forward(c, &required))
                .cloned()
                .collect()
        }
        CompatibilityMode::Full => {
            let required = newly_required_paths(diff);
            diff.changes
                .iter()
                .filter(|c| breaks_backward(c.kind) || breaks_forward(c, &required))
                .cloned()
                .collect()
        }
    }
}

/// Whether `diff` is compatible under `mode`.
pub fn is_compatible(diff: &SchemaDiff, mode: CompatibilityMode) -> bool {
    breaking_changes(diff, mode).is_empty()
}

fn breaks_backward(kind: ChangeKind) -> bool {
    matches!(
        kind,
        ChangeKind::PropertyRemoved
            | ChangeKind::RequiredAdded
            | ChangeKind::TypeChanged
            | ChangeKind::EnumNarrowed
            | ChangeKind::FormatChanged
    )
}

fn breaks_forward(record: &ChangeRecord, newly_required: &HashSet<String>) -> bool {
    match record.kind {
        ChangeKind::TypeChanged | ChangeKind::EnumWidened | ChangeKind::FormatChanged => true,
        // A new optional property is fine for old readers; a new required one
        // is data they cannot produce.
        ChangeKind::PropertyAdded => newly_required.contains(&record.path),
        _ => false,
    }
}

/// Property-pointer equivalents of every `required_added` record, i.e.
/// `/required/name` rewritten to `/properties/name` under the same parent.
fn newly_required_paths(diff: &SchemaDiff) -> HashSet<String> {
    diff.changes
        .iter()
        .filter(|c| c.kind == ChangeKind::RequiredAdded)
        .filter_map(|c| {
            c.path
                .rsplit_once("/required/")
                .map(|(parent, name)| format!("{parent}/properties/{name}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_schemas;
    use serde_json::json;

    fn base() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "email": {"type": "string"}
            },
            "required": ["id"]
        })
    }

    #[test]
    fn test_backward_flags_removal() {
        let new = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "required": ["id"]
        });
        let diff = diff_schemas(&base(), &new);

        let breaking = breaking_changes(&diff, CompatibilityMode::Backward);
        assert_eq!(breaking.len(), 1);
        assert_eq!(breaking[0].kind, ChangeKind::PropertyRemoved);
        assert!(!is_compatible(&diff, CompatibilityMode::Backward));
    }

    #[test]
    fn test_backward_allows_optional_addition() {
        let mut new = base();
        new["properties"]["nickname"] = json!({"type": "string"});
        let diff = diff_schemas(&base(), &new);

        assert!(is_compatible(&diff, CompatibilityMode::Backward));
        // Optional additions are forward-compatible too: old readers ignore
        // fields they do not know.
        assert!(breaking_changes(&diff, CompatibilityMode::Forward).is_empty());
    }

    #[test]
    fn test_forward_flags_required_addition() {
        let mut new = base();
        new["properties"]["region"] = json!({"type": "string"});
        new["required"] = json!(["id", "region"]);
        let diff = diff_schemas(&base(), &new);

        let breaking = breaking_changes(&diff, CompatibilityMode::Forward);
        let kinds: Vec<ChangeKind> = breaking.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ChangeKind::PropertyAdded));
    }

    #[test]
    fn test_forward_flags_enum_widening_backward_does_not() {
        let old = json!({"type": "string", "enum": ["a", "b"]});
        let new = json!({"type": "string", "enum": ["a", "b", "c"]});
        let diff = diff_schemas(&old, &new);

        assert!(is_compatible(&diff, CompatibilityMode::Backward));
        assert!(!is_compatible(&diff, CompatibilityMode::Forward));
        assert!(!is_compatible(&diff, CompatibilityMode::Full));
    }

    #[test]
    fn test_none_is_never_breaking() {
        let new = json!({"type": "object", "properties": {}, "required": []});
        let diff = diff_schemas(&base(), &new);

        assert!(!diff.is_empty());
        assert!(is_compatible(&diff, CompatibilityMode::None));
        assert!(breaking_changes(&diff, CompatibilityMode::None).is_empty());
    }

    #[test]
    fn test_full_is_union_of_directions() {
        let mut new = base();
        new["properties"]["status"] = json!({"type": "string", "enum": ["on", "off"]});
        let old_with_enum = {
            let mut v = new.clone();
            v["properties"]["status"] = json!({"type": "string", "enum": ["on"]});
            v
        };
        let diff = diff_schemas(&old_with_enum, &new);

        let backward = breaking_changes(&diff, CompatibilityMode::Backward);
        let forward = breaking_changes(&diff, CompatibilityMode::Forward);
        let full = breaking_changes(&diff, CompatibilityMode::Full);
        assert!(full.len() >= backward.len());
        assert!(full.len() >= forward.len());
    }
}

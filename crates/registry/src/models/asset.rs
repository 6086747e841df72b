use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::models::enums::{DependencyType, GuaranteeMode, ResourceType};

/// A named data artifact: warehouse table, API endpoint, event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub fqn: String,
    pub owner_team_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<Uuid>,
    pub environment: String,
    pub resource_type: ResourceType,
    pub guarantee_mode: GuaranteeMode,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Directed edge: `dependent_asset_id` reads from `dependency_asset_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDependency {
    pub id: Uuid,
    pub dependent_asset_id: Uuid,
    pub dependency_asset_id: Uuid,
    pub dependency_type: DependencyType,
    pub created_at: DateTime<Utc>,
}

/// Validate a fully qualified name: dot-separated segments, each starting
/// with a letter or underscore and continuing with alphanumerics or
/// underscores. At least two segments.
pub fn validate_fqn(fqn: &str, max_length: usize) -> Result<()> {
    if fqn.len() > max_length || fqn.is_empty() {
        return Err(RegistryError::InvalidFqn(fqn.to_string()));
    }
    let segments: Vec<&str> = fqn.split('.').collect();
    if segments.len() < 2 {
        return Err(RegistryError::InvalidFqn(fqn.to_string()));
    }
    for segment in segments {
        let mut chars = segment.chars();
        let valid_head = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if !valid_head || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RegistryError::InvalidFqn(fqn.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fqns() {
        for fqn in [
            "warehouse.analytics.dim_customers",
            "schema.table",
            "_private.table_1",
            "a.b",
        ] {
            assert!(validate_fqn(fqn, 1000).is_ok(), "expected valid: {fqn}");
        }
    }

    #[test]
    fn test_invalid_fqns() {
        for fqn in [
            "",
            "single_segment",
            "1db.table",
            "db..table",
            "db.table-name",
            ".leading.dot",
            "trailing.dot.",
            "spa ce.table",
        ] {
            assert!(validate_fqn(fqn, 1000).is_err(), "expected invalid: {fqn}");
        }
    }

    #[test]
    fn test_fqn_length_cap() {
        let long = format!("db.{}", "x".repeat(100));
        assert!(validate_fqn(&long, 50).is_err());
        assert!(validate_fqn(&long, 1000).is_ok());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::enums::{ContractStatus, RegistrationStatus};
use tessera_engine::CompatibilityMode;

/// A versioned schema governing one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub version: String,
    #[serde(rename = "schema")]
    pub schema_def: Value,
    pub compatibility_mode: CompatibilityMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantees: Option<Value>,
    pub status: ContractStatus,
    pub published_at: DateTime<Utc>,
    pub published_by: Uuid,
}

/// Quality guarantees carried alongside a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Guarantees {
    /// e.g. `{"max_staleness_minutes": 60}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Value>,
    /// e.g. `{"min_rows": 1000}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Value>,
    /// Column nullability, e.g. `{"customer_id": "never"}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullability: Option<Value>,
    /// Accepted values per column, e.g. `{"status": ["active", "churned"]}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_values: Option<Value>,
}

/// A consumer team's declared dependency on a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub consumer_team_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_version: Option<String>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

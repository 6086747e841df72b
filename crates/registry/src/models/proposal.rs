use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::enums::ProposalStatus;
use tessera_engine::ChangeType;

/// A breaking change awaiting consumer sign-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub proposed_schema: Value,
    pub change_type: ChangeType,
    /// Serialized [`tessera_engine::ChangeRecord`] list.
    pub breaking_changes: Value,
    pub status: ProposalStatus,
    pub proposed_by: Uuid,
    pub proposed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_expire: bool,
}

/// Consumer response to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckResponse {
    Approved,
    Blocked,
    Migrating,
}

impl AckResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Blocked => "blocked",
            Self::Migrating => "migrating",
        }
    }
}

/// One consumer team's recorded response to a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub consumer_team_id: Uuid,
    pub response: AckResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub responded_at: DateTime<Utc>,
}

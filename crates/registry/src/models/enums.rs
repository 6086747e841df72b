//! Enumerations for registry entities.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Deprecated,
    Retired,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deprecated => "deprecated",
            Self::Retired => "retired",
        }
    }
}

/// Status of a consumer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Active,
    Migrating,
    Inactive,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Migrating => "migrating",
            Self::Inactive => "inactive",
        }
    }
}

/// Status of a breaking-change proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
    Expired,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Type of asset-to-asset dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Direct data consumption.
    Consumes,
    /// Foreign key or reference.
    References,
    /// Derived via transformation.
    Transforms,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumes => "consumes",
            Self::References => "references",
            Self::Transforms => "transforms",
        }
    }
}

/// API key permission scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiScope {
    /// List/view operations.
    Read,
    /// Create/update operations.
    Write,
    /// Key management, team management, destructive operations.
    Admin,
}

impl ApiScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }

    pub fn all() -> Vec<ApiScope> {
        vec![Self::Read, Self::Write, Self::Admin]
    }
}

impl std::fmt::Display for ApiScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Queued for delivery.
    Pending,
    /// Delivered (2xx response).
    Delivered,
    /// Gave up after the retry cap.
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// How guarantee changes on an asset are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuaranteeMode {
    /// Log changes and notify subscribers.
    Notify,
    /// Treat guarantee removal like a schema break.
    Strict,
    /// Do not track guarantee changes.
    Ignore,
}

impl GuaranteeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Strict => "strict",
            Self::Ignore => "ignore",
        }
    }
}

/// User role for session-based access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    TeamAdmin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::TeamAdmin => "team_admin",
            Self::User => "user",
        }
    }

    /// Scopes granted to a session with this role.
    pub fn scopes(&self) -> Vec<ApiScope> {
        match self {
            Self::Admin => ApiScope::all(),
            Self::TeamAdmin => vec![ApiScope::Read, ApiScope::Write],
            Self::User => vec![ApiScope::Read],
        }
    }
}

/// Kind of resource an asset points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Model,
    Source,
    Seed,
    Snapshot,
    ApiEndpoint,
    GraphqlQuery,
    KafkaTopic,
    EventStream,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Source => "source",
            Self::Seed => "seed",
            Self::Snapshot => "snapshot",
            Self::ApiEndpoint => "api_endpoint",
            Self::GraphqlQuery => "graphql_query",
            Self::KafkaTopic => "kafka_topic",
            Self::EventStream => "event_stream",
            Self::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_scope_mapping() {
        assert_eq!(UserRole::Admin.scopes().len(), 3);
        assert_eq!(
            UserRole::TeamAdmin.scopes(),
            vec![ApiScope::Read, ApiScope::Write]
        );
        assert_eq!(UserRole::User.scopes(), vec![ApiScope::Read]);
    }

    #[test]
    fn test_terminal_proposal_states() {
        assert!(!ProposalStatus::Pending.is_terminal());
        for status in [
            ProposalStatus::Approved,
            ProposalStatus::Rejected,
            ProposalStatus::Withdrawn,
            ProposalStatus::Expired,
        ] {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_enum_wire_names_are_snake_case() {
        let json = serde_json::to_string(&UserRole::TeamAdmin).unwrap();
        assert_eq!(json, "\"team_admin\"");
        let json = serde_json::to_string(&ResourceType::ApiEndpoint).unwrap();
        assert_eq!(json, "\"api_endpoint\"");
    }
}

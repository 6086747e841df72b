//! Request and response models for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use tessera_registry::models::enums::{
    ApiScope, ContractStatus, DeliveryStatus, DependencyType, GuaranteeMode, ProposalStatus,
    RegistrationStatus, ResourceType,
};
use tessera_registry::models::{AckResponse, CompatibilityMode, Guarantees};
use tessera_registry::store::Page;
use tessera_registry::Settings;

/// Standard list envelope.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub results: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> ListResponse<T> {
    pub fn new(results: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            results,
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// `limit`/`offset` query parameters, clamped to the configured bounds.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationQuery {
    pub fn page(&self, settings: &Settings) -> Page {
        let limit = self
            .limit
            .unwrap_or(settings.pagination_limit_default)
            .clamp(1, settings.pagination_limit_max);
        let offset = self.offset.unwrap_or(0).max(0);
        Page::new(limit, offset)
    }
}

#[derive(Debug, Deserialize)]
pub struct TeamCreate {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TeamListQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetCreate {
    pub fqn: String,
    pub owner_team_id: Uuid,
    pub owner_user_id: Option<Uuid>,
    pub environment: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub guarantee_mode: Option<GuaranteeMode>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AssetUpdate {
    pub fqn: Option<String>,
    pub owner_team_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
    pub environment: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub guarantee_mode: Option<GuaranteeMode>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AssetListQuery {
    pub owner: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ContractPublish {
    /// Omitted: the engine auto-bumps the predecessor version.
    pub version: Option<String>,
    #[serde(rename = "schema")]
    pub schema_def: Value,
    pub compatibility_mode: Option<CompatibilityMode>,
    pub guarantees: Option<Guarantees>,
}

#[derive(Debug, Deserialize)]
pub struct PublishQuery {
    pub published_by: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContractListQuery {
    pub asset_id: Option<Uuid>,
    pub status: Option<ContractStatus>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContractCompareRequest {
    pub contract_id_1: Uuid,
    pub contract_id_2: Uuid,
    pub compatibility_mode: Option<CompatibilityMode>,
}

#[derive(Debug, Deserialize)]
pub struct GuaranteesUpdate {
    pub guarantees: Guarantees,
}

#[derive(Debug, Deserialize)]
pub struct ImpactQuery {
    pub depth: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DependencyCreate {
    pub depends_on_asset_id: Uuid,
    pub dependency_type: Option<DependencyType>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationQuery {
    pub contract_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationCreate {
    pub consumer_team_id: Uuid,
    pub pinned_version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationUpdate {
    pub status: Option<RegistrationStatus>,
    pub pinned_version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProposalListQuery {
    pub asset_id: Option<Uuid>,
    pub status: Option<ProposalStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgmentCreate {
    pub consumer_team_id: Uuid,
    pub response: AckResponse,
    pub migration_deadline: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub action: Option<String>,
    pub actor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyCreate {
    pub name: String,
    pub team_id: Uuid,
    pub scopes: Option<Vec<ApiScope>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyListQuery {
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub include_revoked: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookListQuery {
    pub status: Option<DeliveryStatus>,
    pub event_type: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamping() {
        let settings = Settings::default();

        let query = PaginationQuery {
            limit: Some(10_000),
            offset: Some(-5),
        };
        let page = query.page(&settings);
        assert_eq!(page.limit, settings.pagination_limit_max);
        assert_eq!(page.offset, 0);

        let query = PaginationQuery::default();
        let page = query.page(&settings);
        assert_eq!(page.limit, settings.pagination_limit_default);
        assert_eq!(page.offset, 0);

        let query = PaginationQuery {
            limit: Some(0),
            offset: None,
        };
        assert_eq!(query.page(&settings).limit, 1);
    }
}

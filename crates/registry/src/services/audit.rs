//! Append-only audit trail.
//!
//! One write path; events participate in the caller's transaction, so an
//! audit record can never outlive a rolled-back mutation.

use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::Result;
use crate::models::AuditEvent;
use crate::store;

/// Types of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    TeamCreated,
    TeamUpdated,
    AssetCreated,
    AssetUpdated,
    ContractPublished,
    ContractDeprecated,
    ContractForcePublished,
    ContractGuaranteesUpdated,
    RegistrationCreated,
    RegistrationUpdated,
    RegistrationDeleted,
    ProposalCreated,
    ProposalAcknowledged,
    ProposalWithdrawn,
    ProposalForceApproved,
    ProposalExpired,
    ApiKeyCreated,
    ApiKeyRevoked,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamCreated => "team.created",
            Self::TeamUpdated => "team.updated",
            Self::AssetCreated => "asset.created",
            Self::AssetUpdated => "asset.updated",
            Self::ContractPublished => "contract.published",
            Self::ContractDeprecated => "contract.deprecated",
            Self::ContractForcePublished => "contract.force_published",
            Self::ContractGuaranteesUpdated => "contract.guarantees_updated",
            Self::RegistrationCreated => "registration.created",
            Self::RegistrationUpdated => "registration.updated",
            Self::RegistrationDeleted => "registration.deleted",
            Self::ProposalCreated => "proposal.created",
            Self::ProposalAcknowledged => "proposal.acknowledged",
            Self::ProposalWithdrawn => "proposal.withdrawn",
            Self::ProposalForceApproved => "proposal.force_approved",
            Self::ProposalExpired => "proposal.expired",
            Self::ApiKeyCreated => "api_key.created",
            Self::ApiKeyRevoked => "api_key.revoked",
        }
    }

    /// The entity type the action applies to.
    pub fn entity_type(&self) -> &'static str {
        self.as_str()
            .split_once('.')
            .map(|(entity, _)| entity)
            .unwrap_or("unknown")
    }
}

/// Record an audit event inside the caller's transaction.
pub async fn log_event(
    conn: &mut PgConnection,
    entity_id: Uuid,
    action: AuditAction,
    actor_id: Option<Uuid>,
    payload: Value,
) -> Result<AuditEvent> {
    store::audit::insert(
        conn,
        action.entity_type(),
        entity_id,
        action.as_str(),
        actor_id,
        &payload,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::ContractPublished.as_str(), "contract.published");
        assert_eq!(
            AuditAction::ProposalForceApproved.as_str(),
            "proposal.force_approved"
        );
        assert_eq!(AuditAction::ApiKeyRevoked.as_str(), "api_key.revoked");
    }

    #[test]
    fn test_entity_type_derivation() {
        assert_eq!(AuditAction::ContractPublished.entity_type(), "contract");
        assert_eq!(AuditAction::ApiKeyCreated.entity_type(), "api_key");
        assert_eq!(AuditAction::RegistrationDeleted.entity_type(), "registration");
    }
}

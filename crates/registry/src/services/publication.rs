//! The publication engine.
//!
//! Decides whether an incoming schema becomes a published contract, a
//! force-published contract, or a pending proposal, and deprecates the
//! predecessor atomically. All writes happen on the caller's transaction.

use chrono::Utc;
use semver::Version;
use serde_json::{json, Value};
use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use tessera_engine::{
    breaking_changes, diff_schemas, validate_schema, version as semver_util, ChangeRecord,
    ChangeType, CompatibilityMode,
};

use crate::config::Settings;
use crate::error::{RegistryError, Result};
use crate::models::enums::ContractStatus;
use crate::models::{Contract, Proposal};
use crate::services::audit::{log_event, AuditAction};
use crate::services::{expiration, webhook};
use crate::store;

/// Caller's intent for one publish call.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Omitted: auto-bump the predecessor by the classified change type.
    pub version: Option<String>,
    pub schema: Value,
    pub compatibility_mode: CompatibilityMode,
    pub guarantees: Option<Value>,
    pub force: bool,
}

/// What the engine decided.
#[derive(Debug)]
pub enum PublishOutcome {
    Published {
        contract: Contract,
        change_type: Option<ChangeType>,
    },
    ForcePublished {
        contract: Contract,
        change_type: ChangeType,
        breaking: Vec<ChangeRecord>,
    },
    ProposalCreated {
        proposal: Proposal,
        change_type: ChangeType,
        breaking: Vec<ChangeRecord>,
    },
}

/// Publish a schema for an asset.
///
/// State transitions:
/// 1. no active predecessor: insert the first contract as `active`
/// 2. compatible diff: insert the successor, deprecate the predecessor
/// 3. breaking diff without `force`: open a pending proposal instead
/// 4. breaking diff with `force`: like (2) plus a force audit trail
pub async fn publish(
    conn: &mut PgConnection,
    asset_id: Uuid,
    published_by: Uuid,
    request: PublishRequest,
    settings: &Settings,
) -> Result<PublishOutcome> {
    validate_schema(&request.schema, &settings.schema_limits())?;

    store::assets::get(conn, asset_id).await?;
    store::teams::get(conn, published_by).await?;

    let predecessor = store::contracts::active_for_asset(conn, asset_id).await?;

    let Some(predecessor) = predecessor else {
        let version = match &request.version {
            Some(raw) => semver_util::parse_version(raw)?.to_string(),
            None => semver_util::INITIAL_VERSION.to_string(),
        };
        let contract = insert_contract(conn, asset_id, published_by, &version, &request).await?;
        log_event(
            conn,
            contract.id,
            AuditAction::ContractPublished,
            Some(published_by),
            json!({"version": contract.version, "change_type": null, "force": false}),
        )
        .await?;
        info!(%asset_id, version = %contract.version, "First contract published");
        return Ok(PublishOutcome::Published {
            contract,
            change_type: None,
        });
    };

    let diff = diff_schemas(&predecessor.schema_def, &request.schema);
    let version = resolve_version(request.version.as_deref(), &predecessor.version, diff.change_type)?;
    let breaking = breaking_changes(&diff, predecessor.compatibility_mode);

    if breaking.is_empty() {
        let contract =
            supersede(conn, asset_id, published_by, &version, &request, &predecessor).await?;
        log_event(
            conn,
            contract.id,
            AuditAction::ContractPublished,
            Some(published_by),
            json!({
                "version": contract.version,
                "change_type": diff.change_type.as_str(),
                "force": false,
            }),
        )
        .await?;
        webhook::enqueue_event(
            conn,
            settings,
            "contract.published",
            json!({
                "id": contract.id,
                "asset_id": asset_id,
                "version": contract.version,
                "change_type": diff.change_type.as_str(),
            }),
        )
        .await?;
        info!(%asset_id, version = %contract.version, change_type = %diff.change_type, "Contract published");
        return Ok(PublishOutcome::Published {
            contract,
            change_type: Some(diff.change_type),
        });
    }

    if request.force {
        let contract =
            supersede(conn, asset_id, published_by, &version, &request, &predecessor).await?;
        let breaking_json = serde_json::to_value(&breaking)
            .map_err(|e| RegistryError::Internal(e.to_string()))?;
        log_event(
            conn,
            contract.id,
            AuditAction::ContractForcePublished,
            Some(published_by),
            json!({
                "version": contract.version,
                "change_type": diff.change_type.as_str(),
                "force": true,
                "breaking_changes": breaking_json,
            }),
        )
        .await?;
        webhook::enqueue_event(
            conn,
            settings,
            "contract.force_published",
            json!({
                "id": contract.id,
                "asset_id": asset_id,
                "version": contract.version,
                "change_type": diff.change_type.as_str(),
                "breaking_changes_count": breaking.len(),
            }),
        )
        .await?;
        info!(%asset_id, version = %contract.version, "Breaking change force-published");
        return Ok(PublishOutcome::ForcePublished {
            contract,
            change_type: diff.change_type,
            breaking,
        });
    }

    let breaking_json =
        serde_json::to_value(&breaking).map_err(|e| RegistryError::Internal(e.to_string()))?;
    let expires_at = expiration::default_expiration(Utc::now(), settings.proposal_expiration_days);
    let proposal = store::proposals::insert(
        conn,
        store::proposals::NewProposal {
            asset_id,
            proposed_schema: &request.schema,
            change_type: diff.change_type,
            breaking_changes: &breaking_json,
            proposed_by: published_by,
            expires_at: Some(expires_at),
            auto_expire: settings.proposal_auto_expire_enabled,
        },
    )
    .await?;
    log_event(
        conn,
        proposal.id,
        AuditAction::ProposalCreated,
        Some(published_by),
        json!({
            "asset_id": asset_id,
            "change_type": diff.change_type.as_str(),
            "breaking_changes_count": breaking.len(),
        }),
    )
    .await?;
    webhook::enqueue_event(
        conn,
        settings,
        "proposal.created",
        json!({
            "id": proposal.id,
            "asset_id": asset_id,
            "change_type": diff.change_type.as_str(),
            "breaking_changes": breaking_json,
        }),
    )
    .await?;
    info!(%asset_id, proposal_id = %proposal.id, "Breaking change held for consumer sign-off");
    Ok(PublishOutcome::ProposalCreated {
        proposal,
        change_type: diff.change_type,
        breaking,
    })
}

/// Pick the successor version: a supplied version must be strictly greater
/// than the predecessor; an omitted one is bumped by the change type.
fn resolve_version(
    supplied: Option<&str>,
    predecessor: &str,
    change_type: ChangeType,
) -> Result<String> {
    let prev: Version = semver_util::parse_version(predecessor)?;
    match supplied {
        Some(raw) => {
            let candidate = semver_util::parse_version(raw)?;
            semver_util::ensure_greater(&candidate, &prev)?;
            Ok(candidate.to_string())
        }
        None => Ok(semver_util::bump(&prev, change_type).to_string()),
    }
}

async fn insert_contract(
    conn: &mut PgConnection,
    asset_id: Uuid,
    published_by: Uuid,
    version: &str,
    request: &PublishRequest,
) -> Result<Contract> {
    store::contracts::insert(
        conn,
        store::contracts::NewContract {
            asset_id,
            version,
            schema_def: &request.schema,
            compatibility_mode: request.compatibility_mode,
            guarantees: request.guarantees.as_ref(),
            published_by,
        },
    )
    .await
}

/// Deprecate the predecessor, then insert the successor. The partial unique
/// index on active contracts requires this order; a concurrent publish loses
/// the race at commit and surfaces as a retriable conflict.
async fn supersede(
    conn: &mut PgConnection,
    asset_id: Uuid,
    published_by: Uuid,
    version: &str,
    request: &PublishRequest,
    predecessor: &Contract,
) -> Result<Contract> {
    store::contracts::set_status(conn, predecessor.id, ContractStatus::Deprecated).await?;
    log_event(
        conn,
        predecessor.id,
        AuditAction::ContractDeprecated,
        Some(published_by),
        json!({"version": predecessor.version, "superseded_by": version}),
    )
    .await?;
    insert_contract(conn, asset_id, published_by, version, request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplied_version_must_exceed_predecessor() {
        assert_eq!(
            resolve_version(Some("2.0.0"), "1.4.2", ChangeType::Major).unwrap(),
            "2.0.0"
        );
        assert!(resolve_version(Some("1.4.2"), "1.4.2", ChangeType::Patch).is_err());
        assert!(resolve_version(Some("1.0.0"), "1.4.2", ChangeType::Minor).is_err());
    }

    #[test]
    fn test_omitted_version_auto_bumps() {
        assert_eq!(
            resolve_version(None, "1.4.2", ChangeType::Patch).unwrap(),
            "1.4.3"
        );
        assert_eq!(
            resolve_version(None, "1.4.2", ChangeType::Minor).unwrap(),
            "1.5.0"
        );
        assert_eq!(
            resolve_version(None, "1.4.2", ChangeType::Major).unwrap(),
            "2.0.0"
        );
    }

    #[test]
    fn test_malformed_versions_rejected() {
        assert!(resolve_version(Some("not-semver"), "1.0.0", ChangeType::Patch).is_err());
        assert!(resolve_version(None, "also-bad", ChangeType::Patch).is_err());
    }
}

//! Asset endpoints: CRUD, contract publication, impact analysis, lineage,
//! and dependency edges.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use tessera_registry::models::enums::{ApiScope, DependencyType, GuaranteeMode, ResourceType};
use tessera_registry::models::{
    validate_fqn, Asset, AssetDependency, CompatibilityMode, Contract, Registration,
};
use tessera_registry::services::audit::{log_event, AuditAction};
use tessera_registry::services::publication::{publish, PublishOutcome, PublishRequest};
use tessera_registry::services::{impact, Namespace};
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::extract::Json as BodyJson;
use crate::models::{
    AssetCreate, AssetListQuery, AssetUpdate, ContractPublish, DependencyCreate, ImpactQuery,
    ListResponse, PaginationQuery, PublishQuery,
};
use crate::state::AppState;

/// Create a new asset owned by the caller's team.
pub async fn create_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    BodyJson(body): BodyJson<AssetCreate>,
) -> Result<(StatusCode, Json<Asset>)> {
    auth.require_scope(ApiScope::Write)?;
    auth.require_team(
        body.owner_team_id,
        "You can only create assets owned by your own team",
    )?;
    validate_fqn(&body.fqn, state.settings.max_fqn_length)?;

    let mut tx = state.db.begin().await?;
    store::teams::get(&mut tx, body.owner_team_id).await?;

    let metadata = body.metadata.unwrap_or_else(|| json!({}));
    let asset = store::assets::insert(
        &mut tx,
        store::assets::NewAsset {
            fqn: &body.fqn,
            owner_team_id: body.owner_team_id,
            owner_user_id: body.owner_user_id,
            environment: body
                .environment
                .as_deref()
                .unwrap_or(&state.settings.default_environment),
            resource_type: body.resource_type.unwrap_or(ResourceType::Other),
            guarantee_mode: body.guarantee_mode.unwrap_or(GuaranteeMode::Notify),
            metadata: &metadata,
        },
    )
    .await?;
    log_event(
        &mut tx,
        asset.id,
        AuditAction::AssetCreated,
        Some(auth.team_id()),
        json!({"fqn": asset.fqn}),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(asset)))
}

pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<AssetListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Asset>>> {
    auth.require_scope(ApiScope::Read)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    let (assets, total) = store::assets::list(&mut conn, query.owner, page).await?;
    Ok(Json(ListResponse::new(assets, total, page)))
}

pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<Asset>> {
    auth.require_scope(ApiScope::Read)?;

    if let Some(cached) = state
        .cache
        .get_json::<Asset>(Namespace::Asset, &asset_id.to_string())
        .await
    {
        return Ok(Json(cached));
    }

    let mut conn = state.db.acquire().await?;
    let asset = store::assets::get(&mut conn, asset_id).await?;
    state
        .cache
        .set_json(Namespace::Asset, &asset_id.to_string(), &asset)
        .await;
    Ok(Json(asset))
}

/// Update an asset. Caller must own it or hold admin scope.
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
    BodyJson(body): BodyJson<AssetUpdate>,
) -> Result<Json<Asset>> {
    auth.require_scope(ApiScope::Write)?;

    let mut tx = state.db.begin().await?;
    let existing = store::assets::get(&mut tx, asset_id).await?;
    auth.require_team(
        existing.owner_team_id,
        "You can only update assets owned by your own team",
    )?;
    if let Some(fqn) = &body.fqn {
        validate_fqn(fqn, state.settings.max_fqn_length)?;
    }

    let asset = store::assets::update(
        &mut tx,
        asset_id,
        store::assets::AssetUpdate {
            fqn: body.fqn.as_deref(),
            owner_team_id: body.owner_team_id,
            owner_user_id: body.owner_user_id,
            environment: body.environment.as_deref(),
            resource_type: body.resource_type,
            guarantee_mode: body.guarantee_mode,
            metadata: body.metadata.as_ref(),
        },
    )
    .await?;
    log_event(
        &mut tx,
        asset.id,
        AuditAction::AssetUpdated,
        Some(auth.team_id()),
        json!({"fqn": asset.fqn}),
    )
    .await?;
    tx.commit().await?;

    state.cache.invalidate_lineage(asset_id).await;
    Ok(Json(asset))
}

/// Publish a schema for an asset.
///
/// Compatible changes publish immediately and deprecate the predecessor;
/// breaking changes open a proposal unless `force=true`.
pub async fn publish_contract(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
    Query(query): Query<PublishQuery>,
    BodyJson(body): BodyJson<ContractPublish>,
) -> Result<(StatusCode, Json<Value>)> {
    auth.require_scope(ApiScope::Write)?;
    auth.require_team(
        query.published_by,
        "You can only publish contracts on behalf of your own team",
    )?;

    let mut tx = state.db.begin().await?;
    let asset = store::assets::get(&mut tx, asset_id).await?;
    auth.require_team(
        asset.owner_team_id,
        "You can only publish contracts for assets owned by your own team",
    )?;

    let predecessor = store::contracts::active_for_asset(&mut tx, asset_id).await?;
    let guarantees = body
        .guarantees
        .map(|g| serde_json::to_value(g))
        .transpose()
        .map_err(|e| RegistryError::Internal(e.to_string()))?;

    let outcome = publish(
        &mut tx,
        asset_id,
        query.published_by,
        PublishRequest {
            version: body.version,
            schema: body.schema_def,
            compatibility_mode: body.compatibility_mode.unwrap_or(CompatibilityMode::Backward),
            guarantees,
            force: query.force,
        },
        &state.settings,
    )
    .await?;
    tx.commit().await?;

    let response = match outcome {
        PublishOutcome::Published {
            contract,
            change_type,
        } => {
            state
                .cache
                .invalidate_publication(asset_id, predecessor.map(|p| p.id))
                .await;
            json!({
                "action": "published",
                "change_type": change_type.map(|c| c.as_str()),
                "contract": contract,
            })
        }
        PublishOutcome::ForcePublished {
            contract,
            change_type,
            breaking,
        } => {
            state
                .cache
                .invalidate_publication(asset_id, predecessor.map(|p| p.id))
                .await;
            json!({
                "action": "force_published",
                "change_type": change_type.as_str(),
                "breaking_changes": breaking,
                "contract": contract,
                "warning": "Breaking change was force-published. Consumers may be affected.",
            })
        }
        PublishOutcome::ProposalCreated {
            proposal,
            change_type,
            breaking,
        } => json!({
            "action": "proposal_created",
            "change_type": change_type.as_str(),
            "breaking_changes": breaking,
            "proposal": proposal,
            "message": "Breaking change detected. Proposal created for consumer acknowledgment.",
        }),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Full contract history of an asset, oldest first.
pub async fn list_asset_contracts(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<Vec<Contract>>> {
    auth.require_scope(ApiScope::Read)?;

    let mut conn = state.db.acquire().await?;
    store::assets::get(&mut conn, asset_id).await?;
    let contracts = store::contracts::list_for_asset(&mut conn, asset_id).await?;
    Ok(Json(contracts))
}

/// Analyze the blast radius of a proposed schema change.
pub async fn analyze_impact(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
    Query(query): Query<ImpactQuery>,
    BodyJson(proposed_schema): BodyJson<Value>,
) -> Result<Json<impact::ImpactAnalysis>> {
    auth.require_scope(ApiScope::Read)?;

    let depth = query
        .depth
        .unwrap_or(state.settings.impact_depth_default)
        .clamp(1, state.settings.impact_depth_max);

    let mut tx = state.db.begin().await?;
    let analysis = impact::analyze_impact(
        &mut tx,
        asset_id,
        &proposed_schema,
        depth,
        &state.settings.schema_limits(),
    )
    .await?;
    tx.commit().await?;
    Ok(Json(analysis))
}

/// Upstream and downstream lineage for an asset.
pub async fn get_lineage(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<Value>> {
    auth.require_scope(ApiScope::Read)?;

    if let Some(cached) = state
        .cache
        .get_json::<Value>(Namespace::Lineage, &asset_id.to_string())
        .await
    {
        return Ok(Json(cached));
    }

    let mut conn = state.db.acquire().await?;
    let asset = store::assets::get(&mut conn, asset_id).await?;
    let owner_team = store::teams::get(&mut conn, asset.owner_team_id).await?;

    let upstream = store::dependencies::upstream_of(&mut conn, asset_id).await?;
    let downstream_assets = store::dependencies::downstream_of(&mut conn, asset_id).await?;

    // Consumer teams across every contract version of this asset.
    let contract_ids = store::contracts::ids_for_asset(&mut conn, asset_id).await?;
    let mut downstream_teams: Vec<Value> = Vec::new();
    if !contract_ids.is_empty() {
        let registrations =
            store::registrations::list_for_contracts(&mut conn, &contract_ids).await?;
        let mut by_team: std::collections::BTreeMap<Uuid, Vec<&Registration>> = Default::default();
        for registration in &registrations {
            by_team
                .entry(registration.consumer_team_id)
                .or_default()
                .push(registration);
        }
        for (team_id, team_registrations) in by_team {
            let team_name = match store::teams::get(&mut conn, team_id).await {
                Ok(team) => team.name,
                Err(_) => continue,
            };
            downstream_teams.push(json!({
                "team_id": team_id,
                "team_name": team_name,
                "registrations": team_registrations
                    .iter()
                    .map(|r| json!({
                        "contract_id": r.contract_id,
                        "status": r.status,
                        "pinned_version": r.pinned_version,
                    }))
                    .collect::<Vec<_>>(),
            }));
        }
    }

    let lineage = json!({
        "asset_id": asset_id,
        "asset_fqn": asset.fqn,
        "owner_team_id": asset.owner_team_id,
        "owner_team_name": owner_team.name,
        "upstream": upstream,
        "downstream": downstream_teams,
        "downstream_assets": downstream_assets,
    });

    state
        .cache
        .set_json(Namespace::Lineage, &asset_id.to_string(), &lineage)
        .await;
    Ok(Json(lineage))
}

/// Register an upstream dependency edge for an asset.
pub async fn create_dependency(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
    BodyJson(body): BodyJson<DependencyCreate>,
) -> Result<(StatusCode, Json<AssetDependency>)> {
    auth.require_scope(ApiScope::Write)?;

    let mut tx = state.db.begin().await?;
    let asset = store::assets::get(&mut tx, asset_id).await?;
    auth.require_team(
        asset.owner_team_id,
        "You can only add dependencies to assets owned by your own team",
    )?;
    store::assets::get(&mut tx, body.depends_on_asset_id).await?;

    let dependency = store::dependencies::insert(
        &mut tx,
        asset_id,
        body.depends_on_asset_id,
        body.dependency_type.unwrap_or(DependencyType::Consumes),
    )
    .await?;
    tx.commit().await?;

    state.cache.invalidate_lineage(asset_id).await;
    state.cache.invalidate_lineage(body.depends_on_asset_id).await;
    Ok((StatusCode::CREATED, Json(dependency)))
}

pub async fn list_dependencies(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<Vec<AssetDependency>>> {
    auth.require_scope(ApiScope::Read)?;

    let mut conn = state.db.acquire().await?;
    store::assets::get(&mut conn, asset_id).await?;
    let dependencies = store::dependencies::list_for_asset(&mut conn, asset_id).await?;
    Ok(Json(dependencies))
}

/// Remove an upstream dependency edge.
pub async fn delete_dependency(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path((asset_id, dependency_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    auth.require_scope(ApiScope::Write)?;

    let mut tx = state.db.begin().await?;
    let asset = store::assets::get(&mut tx, asset_id).await?;
    auth.require_team(
        asset.owner_team_id,
        "You can only delete dependencies for assets owned by your own team",
    )?;
    store::dependencies::delete(&mut tx, asset_id, dependency_id).await?;
    tx.commit().await?;

    state.cache.invalidate_lineage(asset_id).await;
    Ok(StatusCode::NO_CONTENT)
}

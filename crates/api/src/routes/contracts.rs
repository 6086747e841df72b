//! Contract endpoints: lookup, comparison, guarantees, registrations.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use tessera_engine::{breaking_changes, diff_schemas, SchemaDiff};
use tessera_registry::models::enums::{ApiScope, ContractStatus};
use tessera_registry::models::{Contract, Registration};
use tessera_registry::services::audit::{log_event, AuditAction};
use tessera_registry::services::cache::schema_pair_key;
use tessera_registry::services::Namespace;
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::extract::Json as BodyJson;
use crate::models::{
    ContractCompareRequest, ContractListQuery, GuaranteesUpdate, ListResponse, PaginationQuery,
};
use crate::state::AppState;

pub async fn list_contracts(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ContractListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Contract>>> {
    auth.require_scope(ApiScope::Read)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    let (contracts, total) = store::contracts::list(
        &mut conn,
        query.asset_id,
        query.status,
        query.version.as_deref(),
        page,
    )
    .await?;
    Ok(Json(ListResponse::new(contracts, total, page)))
}

pub async fn get_contract(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<Contract>> {
    auth.require_scope(ApiScope::Read)?;

    if let Some(cached) = state
        .cache
        .get_json::<Contract>(Namespace::Contract, &contract_id.to_string())
        .await
    {
        return Ok(Json(cached));
    }

    let mut conn = state.db.acquire().await?;
    let contract = store::contracts::get(&mut conn, contract_id).await?;
    state
        .cache
        .set_json(Namespace::Contract, &contract_id.to_string(), &contract)
        .await;
    Ok(Json(contract))
}

/// Compare two contracts under a compatibility mode (defaults to the first
/// contract's mode). Diff results are cached by schema-pair digest.
pub async fn compare_contracts(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    BodyJson(body): BodyJson<ContractCompareRequest>,
) -> Result<Json<Value>> {
    auth.require_scope(ApiScope::Read)?;

    let mut conn = state.db.acquire().await?;
    let first = store::contracts::get(&mut conn, body.contract_id_1).await?;
    let second = store::contracts::get(&mut conn, body.contract_id_2).await?;
    drop(conn);

    let mode = body.compatibility_mode.unwrap_or(first.compatibility_mode);

    let diff_key = schema_pair_key(&first.schema_def, &second.schema_def);
    let diff = match state
        .cache
        .get_json::<SchemaDiff>(Namespace::SchemaDiff, &diff_key)
        .await
    {
        Some(diff) => diff,
        None => {
            let diff = diff_schemas(&first.schema_def, &second.schema_def);
            state
                .cache
                .set_json(Namespace::SchemaDiff, &diff_key, &diff)
                .await;
            diff
        }
    };
    let breaking = breaking_changes(&diff, mode);

    Ok(Json(json!({
        "contract_1": {
            "id": first.id,
            "version": first.version,
            "published_at": first.published_at,
            "asset_id": first.asset_id,
        },
        "contract_2": {
            "id": second.id,
            "version": second.version,
            "published_at": second.published_at,
            "asset_id": second.asset_id,
        },
        "change_type": diff.change_type.as_str(),
        "is_compatible": breaking.is_empty(),
        "breaking_changes": breaking,
        "all_changes": diff.changes,
        "compatibility_mode": mode.as_str(),
    })))
}

/// Update guarantees on an active contract. Caller must own the asset.
pub async fn update_guarantees(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(contract_id): Path<Uuid>,
    BodyJson(body): BodyJson<GuaranteesUpdate>,
) -> Result<Json<Contract>> {
    auth.require_scope(ApiScope::Write)?;

    let mut tx = state.db.begin().await?;
    let contract = store::contracts::get(&mut tx, contract_id).await?;
    let asset = store::assets::get(&mut tx, contract.asset_id).await?;
    auth.require_team(
        asset.owner_team_id,
        "You can only update guarantees for contracts on assets owned by your own team",
    )?;

    if contract.status != ContractStatus::Active {
        return Err(RegistryError::Validation(vec![format!(
            "cannot update guarantees on a {} contract; only active contracts can be updated",
            contract.status.as_str()
        )])
        .into());
    }

    let old_guarantees = contract.guarantees.clone();
    let new_guarantees =
        serde_json::to_value(&body.guarantees).map_err(|e| RegistryError::Internal(e.to_string()))?;
    let updated = store::contracts::update_guarantees(&mut tx, contract_id, &new_guarantees).await?;
    log_event(
        &mut tx,
        contract_id,
        AuditAction::ContractGuaranteesUpdated,
        Some(auth.team_id()),
        json!({"old": old_guarantees, "new": updated.guarantees}),
    )
    .await?;
    tx.commit().await?;

    state
        .cache
        .delete(Namespace::Contract, &contract_id.to_string())
        .await;
    Ok(Json(updated))
}

pub async fn list_contract_registrations(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(contract_id): Path<Uuid>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Registration>>> {
    auth.require_scope(ApiScope::Read)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    store::contracts::get(&mut conn, contract_id).await?;
    let (registrations, total) =
        store::registrations::list_for_contract(&mut conn, contract_id, page).await?;
    Ok(Json(ListResponse::new(registrations, total, page)))
}

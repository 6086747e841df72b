//! Proposal workflow endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use tessera_registry::models::enums::{ApiScope, ProposalStatus};
use tessera_registry::models::{Acknowledgment, Proposal};
use tessera_registry::services::audit::{log_event, AuditAction};
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::extract::Json as BodyJson;
use crate::models::{AcknowledgmentCreate, ListResponse, PaginationQuery, ProposalListQuery};
use crate::state::AppState;

pub async fn list_proposals(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ProposalListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Proposal>>> {
    auth.require_scope(ApiScope::Read)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    let (proposals, total) =
        store::proposals::list(&mut conn, query.asset_id, query.status, page).await?;
    Ok(Json(ListResponse::new(proposals, total, page)))
}

pub async fn get_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<Proposal>> {
    auth.require_scope(ApiScope::Read)?;

    let mut conn = state.db.acquire().await?;
    let proposal = store::proposals::get(&mut conn, proposal_id).await?;
    Ok(Json(proposal))
}

/// Record a consumer team's response to a pending proposal.
pub async fn acknowledge_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(proposal_id): Path<Uuid>,
    BodyJson(body): BodyJson<AcknowledgmentCreate>,
) -> Result<(StatusCode, Json<Acknowledgment>)> {
    auth.require_scope(ApiScope::Write)?;
    auth.require_team(
        body.consumer_team_id,
        "You can only acknowledge proposals on behalf of your own team",
    )?;

    let mut tx = state.db.begin().await?;
    let proposal = store::proposals::get(&mut tx, proposal_id).await?;
    if proposal.status != ProposalStatus::Pending {
        return Err(
            RegistryError::ProposalNotPending(proposal.status.as_str().to_string()).into(),
        );
    }
    store::teams::get(&mut tx, body.consumer_team_id).await?;

    let acknowledgment = store::proposals::insert_acknowledgment(
        &mut tx,
        proposal_id,
        body.consumer_team_id,
        body.response,
        body.migration_deadline,
        body.notes.as_deref(),
    )
    .await?;
    log_event(
        &mut tx,
        proposal_id,
        AuditAction::ProposalAcknowledged,
        Some(body.consumer_team_id),
        json!({
            "response": acknowledgment.response,
            "notes": acknowledgment.notes,
        }),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(acknowledgment)))
}

/// Withdraw a pending proposal. Proposer's team or admin only.
pub async fn withdraw_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<Proposal>> {
    auth.require_scope(ApiScope::Write)?;

    let mut tx = state.db.begin().await?;
    let proposal = store::proposals::get(&mut tx, proposal_id).await?;
    auth.require_team(
        proposal.proposed_by,
        "Only the proposing team can withdraw a proposal",
    )?;

    let withdrawn =
        store::proposals::resolve(&mut tx, proposal_id, ProposalStatus::Withdrawn).await?;
    log_event(
        &mut tx,
        proposal_id,
        AuditAction::ProposalWithdrawn,
        Some(auth.team_id()),
        json!({"asset_id": withdrawn.asset_id}),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(withdrawn))
}

/// Force-approve a pending proposal, bypassing outstanding consumer
/// responses. Admin only.
pub async fn force_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<Proposal>> {
    auth.require_scope(ApiScope::Admin)?;

    let mut tx = state.db.begin().await?;
    let approved =
        store::proposals::resolve(&mut tx, proposal_id, ProposalStatus::Approved).await?;
    log_event(
        &mut tx,
        proposal_id,
        AuditAction::ProposalForceApproved,
        Some(auth.team_id()),
        json!({"warning": "Proposal force-approved without full consumer acknowledgment"}),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(approved))
}

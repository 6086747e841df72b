//! Team endpoints

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use tessera_registry::models::enums::ApiScope;
use tessera_registry::models::Team;
use tessera_registry::services::audit::{log_event, AuditAction};
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::auth::{verify_can_create_team, AuthContext};
use crate::error::Result;
use crate::extract::Json as BodyJson;
use crate::models::{ListResponse, PaginationQuery, TeamCreate, TeamListQuery, TeamUpdate};
use crate::state::AppState;

fn validate_name(name: &str) -> Result<()> {
    let mut problems = Vec::new();
    if name.is_empty() {
        problems.push("name must not be empty".to_string());
    }
    if name.len() > 255 {
        problems.push("name must be at most 255 characters".to_string());
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::Validation(problems).into())
    }
}

/// Create a new team. Requires admin scope or the bootstrap key; unlike
/// every other endpoint this must also work before any team exists.
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    BodyJson(body): BodyJson<TeamCreate>,
) -> Result<(StatusCode, Json<Team>)> {
    let actor = verify_can_create_team(&state, &headers).await?;
    validate_name(&body.name)?;

    let mut tx = state.db.begin().await?;
    let metadata = body.metadata.unwrap_or_else(|| json!({}));
    let team = store::teams::insert(&mut tx, &body.name, &metadata).await?;
    log_event(
        &mut tx,
        team.id,
        AuditAction::TeamCreated,
        actor,
        json!({"name": team.name}),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<TeamListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Team>>> {
    auth.require_scope(ApiScope::Read)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    let (teams, total) = store::teams::list(&mut conn, query.name.as_deref(), page).await?;
    Ok(Json(ListResponse::new(teams, total, page)))
}

pub async fn get_team(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Team>> {
    auth.require_scope(ApiScope::Read)?;

    let mut conn = state.db.acquire().await?;
    let team = store::teams::get(&mut conn, team_id).await?;
    Ok(Json(team))
}

/// Update a team's name or metadata. Requires admin scope.
pub async fn update_team(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(team_id): Path<Uuid>,
    BodyJson(body): BodyJson<TeamUpdate>,
) -> Result<Json<Team>> {
    auth.require_scope(ApiScope::Admin)?;
    if let Some(name) = &body.name {
        validate_name(name)?;
    }

    let mut tx = state.db.begin().await?;
    let team = store::teams::update(
        &mut tx,
        team_id,
        body.name.as_deref(),
        body.metadata.as_ref(),
    )
    .await?;
    log_event(
        &mut tx,
        team.id,
        AuditAction::TeamUpdated,
        Some(auth.team_id()),
        json!({"name": team.name}),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(team))
}

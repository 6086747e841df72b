//! Consumer registration endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use tessera_registry::models::enums::ApiScope;
use tessera_registry::models::Registration;
use tessera_registry::services::audit::{log_event, AuditAction};
use tessera_registry::store;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::extract::Json as BodyJson;
use crate::models::{RegistrationCreate, RegistrationQuery, RegistrationUpdate};
use crate::state::AppState;

/// Register the caller's team as a consumer of a contract.
pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<RegistrationQuery>,
    BodyJson(body): BodyJson<RegistrationCreate>,
) -> Result<(StatusCode, Json<Registration>)> {
    auth.require_scope(ApiScope::Write)?;
    auth.require_team(
        body.consumer_team_id,
        "You can only register your own team as a consumer",
    )?;

    let mut tx = state.db.begin().await?;
    store::contracts::get(&mut tx, query.contract_id).await?;
    store::teams::get(&mut tx, body.consumer_team_id).await?;

    let registration = store::registrations::insert(
        &mut tx,
        query.contract_id,
        body.consumer_team_id,
        body.pinned_version.as_deref(),
    )
    .await?;
    log_event(
        &mut tx,
        registration.id,
        AuditAction::RegistrationCreated,
        Some(auth.team_id()),
        json!({
            "contract_id": query.contract_id,
            "consumer_team_id": body.consumer_team_id,
        }),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(registration)))
}

/// Update a registration's status or pinned version.
pub async fn update_registration(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(registration_id): Path<Uuid>,
    BodyJson(body): BodyJson<RegistrationUpdate>,
) -> Result<Json<Registration>> {
    auth.require_scope(ApiScope::Write)?;

    let mut tx = state.db.begin().await?;
    let existing = store::registrations::get(&mut tx, registration_id).await?;
    auth.require_team(
        existing.consumer_team_id,
        "You can only update registrations for your own team",
    )?;

    let registration = store::registrations::update(
        &mut tx,
        registration_id,
        body.status,
        body.pinned_version.as_deref(),
    )
    .await?;
    log_event(
        &mut tx,
        registration.id,
        AuditAction::RegistrationUpdated,
        Some(auth.team_id()),
        json!({"status": registration.status}),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(registration))
}

/// Drop a registration.
pub async fn delete_registration(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(registration_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_scope(ApiScope::Write)?;

    let mut tx = state.db.begin().await?;
    let existing = store::registrations::get(&mut tx, registration_id).await?;
    auth.require_team(
        existing.consumer_team_id,
        "You can only delete registrations for your own team",
    )?;

    store::registrations::delete(&mut tx, registration_id).await?;
    log_event(
        &mut tx,
        registration_id,
        AuditAction::RegistrationDeleted,
        Some(auth.team_id()),
        json!({"contract_id": existing.contract_id}),
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

//! API key management endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use tessera_registry::models::enums::ApiScope;
use tessera_registry::models::{ApiKey, ApiKeyCreated};
use tessera_registry::services::audit::{log_event, AuditAction};
use tessera_registry::services::auth as auth_service;
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::extract::Json as BodyJson;
use crate::models::{ApiKeyCreate, ApiKeyListQuery};
use crate::state::AppState;

/// Create a new API key. The raw key appears only in this response.
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    BodyJson(body): BodyJson<ApiKeyCreate>,
) -> Result<(StatusCode, Json<ApiKeyCreated>)> {
    auth.require_scope(ApiScope::Admin)?;
    if body.name.is_empty() || body.name.len() > 255 {
        return Err(RegistryError::Validation(vec![
            "name must be between 1 and 255 characters".to_string(),
        ])
        .into());
    }

    let scopes = body
        .scopes
        .unwrap_or_else(|| vec![ApiScope::Read, ApiScope::Write]);

    let mut tx = state.db.begin().await?;
    let created = auth_service::create_api_key(
        &mut tx,
        &body.name,
        body.team_id,
        &scopes,
        body.expires_at,
        &state.settings.key_environment,
    )
    .await?;
    log_event(
        &mut tx,
        created.id,
        AuditAction::ApiKeyCreated,
        Some(auth.team_id()),
        json!({
            "name": created.name,
            "team_id": created.team_id,
            "scopes": created.scopes,
        }),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// List keys. Non-admin callers only see their own team's keys.
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ApiKeyListQuery>,
) -> Result<Json<serde_json::Value>> {
    auth.require_scope(ApiScope::Read)?;

    let team_id = if auth.has_scope(ApiScope::Admin) {
        query.team_id
    } else {
        Some(auth.team_id())
    };

    let mut conn = state.db.acquire().await?;
    let keys = store::api_keys::list(&mut conn, team_id, query.include_revoked).await?;
    Ok(Json(json!({"keys": keys})))
}

/// Fetch one key. Non-admin callers only see their own team's keys.
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(key_id): Path<Uuid>,
) -> Result<Json<ApiKey>> {
    auth.require_scope(ApiScope::Read)?;

    let mut conn = state.db.acquire().await?;
    let key = store::api_keys::get(&mut conn, key_id).await?;
    if !auth.has_scope(ApiScope::Admin) && key.team_id != auth.team_id() {
        return Err(
            RegistryError::UnauthorizedTeam("Cannot view keys for other teams".to_string()).into(),
        );
    }
    Ok(Json(key))
}

/// Revoke a key. Revoking an already-revoked key is idempotent.
pub async fn revoke_key(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(key_id): Path<Uuid>,
) -> Result<Json<ApiKey>> {
    auth.require_scope(ApiScope::Admin)?;

    let mut tx = state.db.begin().await?;
    let existing = store::api_keys::get(&mut tx, key_id).await?;
    let already_revoked = existing.revoked_at.is_some();

    let revoked = store::api_keys::revoke(&mut tx, key_id, Utc::now()).await?;
    if !already_revoked {
        log_event(
            &mut tx,
            revoked.id,
            AuditAction::ApiKeyRevoked,
            Some(auth.team_id()),
            json!({"name": revoked.name, "team_id": revoked.team_id}),
        )
        .await?;
    }
    tx.commit().await?;

    Ok(Json(revoked))
}

//! Audit trail query endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use tessera_registry::models::enums::ApiScope;
use tessera_registry::models::AuditEvent;
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::models::{AuditListQuery, ListResponse, PaginationQuery};
use crate::state::AppState;

pub async fn list_audit_events(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<AuditListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<AuditEvent>>> {
    auth.require_scope(ApiScope::Read)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    let (events, total) = store::audit::list(
        &mut conn,
        store::audit::AuditFilter {
            entity_type: query.entity_type.as_deref(),
            entity_id: query.entity_id,
            action: query.action.as_deref(),
            actor_id: query.actor_id,
            from: query.from,
            to: query.to,
        },
        page,
    )
    .await?;
    Ok(Json(ListResponse::new(events, total, page)))
}

pub async fn get_audit_event(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<Json<AuditEvent>> {
    auth.require_scope(ApiScope::Read)?;

    let mut conn = state.db.acquire().await?;
    let event = store::audit::get(&mut conn, event_id)
        .await?
        .ok_or(RegistryError::AuditEventNotFound(event_id))?;
    Ok(Json(event))
}

/// Audit history for one entity, newest first.
pub async fn get_entity_history(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<AuditEvent>>> {
    auth.require_scope(ApiScope::Read)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    let (events, total) = store::audit::list(
        &mut conn,
        store::audit::AuditFilter {
            entity_type: Some(&entity_type),
            entity_id: Some(entity_id),
            ..Default::default()
        },
        page,
    )
    .await?;
    Ok(Json(ListResponse::new(events, total, page)))
}

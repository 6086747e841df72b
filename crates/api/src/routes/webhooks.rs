//! Webhook delivery inspection endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use tessera_registry::models::enums::ApiScope;
use tessera_registry::models::WebhookDelivery;
use tessera_registry::store;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::models::{ListResponse, PaginationQuery, WebhookListQuery};
use crate::state::AppState;

pub async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<WebhookListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ListResponse<WebhookDelivery>>> {
    auth.require_scope(ApiScope::Admin)?;

    let page = pagination.page(&state.settings);
    let mut conn = state.db.acquire().await?;
    let (deliveries, total) = store::webhooks::list(
        &mut conn,
        query.status,
        query.event_type.as_deref(),
        page,
    )
    .await?;
    Ok(Json(ListResponse::new(deliveries, total, page)))
}

pub async fn get_delivery(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<WebhookDelivery>> {
    auth.require_scope(ApiScope::Admin)?;

    let mut conn = state.db.acquire().await?;
    let delivery = store::webhooks::get(&mut conn, delivery_id).await?;
    Ok(Json(delivery))
}

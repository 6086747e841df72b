//! Global search endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use tessera_registry::models::enums::ApiScope;
use tessera_registry::services::Namespace;
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::auth::AuthContext;
use crate::error::Result;
use crate::models::SearchQuery;
use crate::state::AppState;

/// Case-insensitive substring search across teams, users, assets, and
/// contracts. Results are grouped by entity type.
pub async fn global_search(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    auth.require_scope(ApiScope::Read)?;
    if query.q.is_empty() {
        return Err(
            RegistryError::Validation(vec!["q must not be empty".to_string()]).into(),
        );
    }
    let limit = query.limit.unwrap_or(10).clamp(1, 50);

    let cache_key = format!("{}:{}", limit, query.q.to_lowercase());
    if let Some(cached) = state
        .cache
        .get_json::<Value>(Namespace::Search, &cache_key)
        .await
    {
        return Ok(Json(cached));
    }

    let mut conn = state.db.acquire().await?;
    let results = store::search::global(&mut conn, &query.q, limit).await?;

    let body = json!({
        "query": query.q,
        "results": {
            "teams": results.teams,
            "users": results.users,
            "assets": results.assets,
            "contracts": results.contracts,
        },
        "counts": {
            "teams": results.teams.len(),
            "users": results.users.len(),
            "assets": results.assets.len(),
            "contracts": results.contracts.len(),
            "total": results.total(),
        },
    });

    state
        .cache
        .set_json(Namespace::Search, &cache_key, &body)
        .await;
    Ok(Json(body))
}

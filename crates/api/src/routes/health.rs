//! Health check endpoint

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::error::Result;
use crate::models::HealthResponse;
use crate::state::AppState;

/// Service status and version. Unauthenticated.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>> {
    let timestamp = chrono::Utc::now().timestamp();

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        timestamp,
    }))
}

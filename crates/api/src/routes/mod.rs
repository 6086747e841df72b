//! API routes

pub mod api_keys;
pub mod assets;
pub mod audit;
pub mod contracts;
pub mod health;
pub mod proposals;
pub mod registrations;
pub mod search;
pub mod teams;
pub mod webhooks;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Teams
        .route("/api/v1/teams", post(teams::create_team).get(teams::list_teams))
        .route(
            "/api/v1/teams/:team_id",
            get(teams::get_team).patch(teams::update_team),
        )
        // Assets
        .route(
            "/api/v1/assets",
            post(assets::create_asset).get(assets::list_assets),
        )
        .route(
            "/api/v1/assets/:asset_id",
            get(assets::get_asset).patch(assets::update_asset),
        )
        .route(
            "/api/v1/assets/:asset_id/contracts",
            post(assets::publish_contract).get(assets::list_asset_contracts),
        )
        .route("/api/v1/assets/:asset_id/impact", post(assets::analyze_impact))
        .route("/api/v1/assets/:asset_id/lineage", get(assets::get_lineage))
        .route(
            "/api/v1/assets/:asset_id/dependencies",
            post(assets::create_dependency).get(assets::list_dependencies),
        )
        .route(
            "/api/v1/assets/:asset_id/dependencies/:dependency_id",
            delete(assets::delete_dependency),
        )
        // Contracts
        .route("/api/v1/contracts", get(contracts::list_contracts))
        .route("/api/v1/contracts/compare", post(contracts::compare_contracts))
        .route("/api/v1/contracts/:contract_id", get(contracts::get_contract))
        .route(
            "/api/v1/contracts/:contract_id/guarantees",
            patch(contracts::update_guarantees),
        )
        .route(
            "/api/v1/contracts/:contract_id/registrations",
            get(contracts::list_contract_registrations),
        )
        // Registrations
        .route(
            "/api/v1/registrations",
            post(registrations::create_registration),
        )
        .route(
            "/api/v1/registrations/:registration_id",
            patch(registrations::update_registration).delete(registrations::delete_registration),
        )
        // Proposals
        .route("/api/v1/proposals", get(proposals::list_proposals))
        .route("/api/v1/proposals/:proposal_id", get(proposals::get_proposal))
        .route(
            "/api/v1/proposals/:proposal_id/acknowledge",
            post(proposals::acknowledge_proposal),
        )
        .route(
            "/api/v1/proposals/:proposal_id/withdraw",
            post(proposals::withdraw_proposal),
        )
        .route(
            "/api/v1/proposals/:proposal_id/force",
            post(proposals::force_proposal),
        )
        // Audit trail
        .route("/api/v1/audit/events", get(audit::list_audit_events))
        .route("/api/v1/audit/events/:event_id", get(audit::get_audit_event))
        .route(
            "/api/v1/audit/entities/:entity_type/:entity_id/history",
            get(audit::get_entity_history),
        )
        // API keys
        .route(
            "/api/v1/api-keys",
            post(api_keys::create_key).get(api_keys::list_keys),
        )
        .route(
            "/api/v1/api-keys/:key_id",
            get(api_keys::get_key).delete(api_keys::revoke_key),
        )
        // Webhook deliveries
        .route(
            "/api/v1/webhooks/deliveries",
            get(webhooks::list_deliveries),
        )
        .route(
            "/api/v1/webhooks/deliveries/:delivery_id",
            get(webhooks::get_delivery),
        )
        // Search
        .route("/api/v1/search", get(search::global_search))
        .with_state(state)
}

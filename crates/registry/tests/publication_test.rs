//! Integration tests for the publication and proposal lifecycle.
//!
//! These need a live Postgres; point DATABASE_URL at a scratch database and
//! run with `cargo test -- --ignored`.

use serde_json::json;
use uuid::Uuid;

use tessera_engine::{ChangeKind, CompatibilityMode};
use tessera_registry::config::Settings;
use tessera_registry::db::Database;
use tessera_registry::models::enums::{ContractStatus, ProposalStatus};
use tessera_registry::models::AckResponse;
use tessera_registry::services::publication::{publish, PublishOutcome, PublishRequest};
use tessera_registry::services::{audit, impact};
use tessera_registry::store;
use tessera_registry::store::Page;

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        settings.database_url = url;
    }
    settings
}

async fn setup() -> (Database, Settings) {
    let settings = test_settings();
    let db = Database::connect(&settings)
        .await
        .expect("Failed to connect to database");
    db.migrate().await.expect("Migrations failed");
    (db, settings)
}

fn customer_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "customer_id": {"type": "integer"},
            "email": {"type": "string"}
        },
        "required": ["customer_id", "email"]
    })
}

fn unique_fqn(prefix: &str) -> String {
    format!("{prefix}.t_{}", Uuid::new_v4().simple())
}

async fn create_team_and_asset(
    conn: &mut sqlx::PgConnection,
    fqn: &str,
) -> (Uuid, Uuid) {
    let team = store::teams::insert(conn, &format!("team-{}", Uuid::new_v4()), &json!({}))
        .await
        .expect("team insert");
    let asset = store::assets::insert(
        conn,
        store::assets::NewAsset {
            fqn,
            owner_team_id: team.id,
            owner_user_id: None,
            environment: "production",
            resource_type: tessera_registry::models::enums::ResourceType::Model,
            guarantee_mode: tessera_registry::models::enums::GuaranteeMode::Notify,
            metadata: &json!({}),
        },
    )
    .await
    .expect("asset insert");
    (team.id, asset.id)
}

fn publish_request(schema: serde_json::Value, version: Option<&str>, force: bool) -> PublishRequest {
    PublishRequest {
        version: version.map(str::to_string),
        schema,
        compatibility_mode: CompatibilityMode::Backward,
        guarantees: None,
        force,
    }
}

#[tokio::test]
#[ignore] // Requires database
async fn test_compatible_addition_publishes_and_deprecates() {
    let (db, settings) = setup().await;
    let mut tx = db.pool().begin().await.unwrap();
    let fqn = unique_fqn("warehouse.analytics");
    let (team_id, asset_id) = create_team_and_asset(&mut tx, &fqn).await;

    let first = publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(customer_schema(), Some("1.0.0"), false),
        &settings,
    )
    .await
    .unwrap();
    let first_contract = match first {
        PublishOutcome::Published { contract, .. } => contract,
        other => panic!("expected Published, got {other:?}"),
    };

    let mut widened = customer_schema();
    widened["properties"]["loyalty_tier"] = json!({
        "type": "string",
        "enum": ["bronze", "silver", "gold"]
    });

    let second = publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(widened, Some("1.1.0"), false),
        &settings,
    )
    .await
    .unwrap();

    match second {
        PublishOutcome::Published {
            contract,
            change_type,
        } => {
            assert_eq!(contract.version, "1.1.0");
            assert_eq!(change_type.unwrap().as_str(), "minor");
        }
        other => panic!("expected Published, got {other:?}"),
    }

    let old = store::contracts::get(&mut tx, first_contract.id).await.unwrap();
    assert_eq!(old.status, ContractStatus::Deprecated);

    let (events, _) = store::audit::list(
        &mut tx,
        store::audit::AuditFilter {
            action: Some(audit::AuditAction::ContractPublished.as_str()),
            ..Default::default()
        },
        Page::new(10, 0),
    )
    .await
    .unwrap();
    assert!(!events.is_empty());

    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database
async fn test_breaking_removal_opens_proposal() {
    let (db, settings) = setup().await;
    let mut tx = db.pool().begin().await.unwrap();
    let fqn = unique_fqn("warehouse.analytics");
    let (team_id, asset_id) = create_team_and_asset(&mut tx, &fqn).await;

    publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(customer_schema(), Some("1.0.0"), false),
        &settings,
    )
    .await
    .unwrap();

    let without_email = json!({
        "type": "object",
        "properties": {"customer_id": {"type": "integer"}},
        "required": ["customer_id"]
    });

    let outcome = publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(without_email, Some("2.0.0"), false),
        &settings,
    )
    .await
    .unwrap();

    let proposal = match outcome {
        PublishOutcome::ProposalCreated {
            proposal,
            change_type,
            breaking,
        } => {
            assert_eq!(change_type.as_str(), "major");
            assert!(breaking
                .iter()
                .any(|c| c.kind == ChangeKind::PropertyRemoved
                    && c.path == "/properties/email"));
            proposal
        }
        other => panic!("expected ProposalCreated, got {other:?}"),
    };
    assert_eq!(proposal.status, ProposalStatus::Pending);
    assert!(proposal.expires_at.is_some());

    // The original contract is still the active one.
    let active = store::contracts::active_for_asset(&mut tx, asset_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.version, "1.0.0");
    assert_eq!(active.status, ContractStatus::Active);

    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database
async fn test_acknowledge_then_withdraw_preserves_ack() {
    let (db, settings) = setup().await;
    let mut tx = db.pool().begin().await.unwrap();
    let fqn = unique_fqn("warehouse.analytics");
    let (team_id, asset_id) = create_team_and_asset(&mut tx, &fqn).await;
    let consumer =
        store::teams::insert(&mut tx, &format!("ml-team-{}", Uuid::new_v4()), &json!({}))
            .await
            .unwrap();

    publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(customer_schema(), None, false),
        &settings,
    )
    .await
    .unwrap();
    let outcome = publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(json!({"type": "object", "properties": {}, "required": []}), None, false),
        &settings,
    )
    .await
    .unwrap();
    let proposal = match outcome {
        PublishOutcome::ProposalCreated { proposal, .. } => proposal,
        other => panic!("expected ProposalCreated, got {other:?}"),
    };

    let ack = store::proposals::insert_acknowledgment(
        &mut tx,
        proposal.id,
        consumer.id,
        AckResponse::Approved,
        None,
        Some("fine by us"),
    )
    .await
    .unwrap();

    let withdrawn = store::proposals::resolve(&mut tx, proposal.id, ProposalStatus::Withdrawn)
        .await
        .unwrap();
    assert_eq!(withdrawn.status, ProposalStatus::Withdrawn);
    assert!(withdrawn.resolved_at.is_some());
    assert!(withdrawn.resolved_at.unwrap() >= withdrawn.proposed_at);

    // Acknowledgment rows survive resolution.
    let acks = store::proposals::list_acknowledgments(&mut tx, proposal.id)
        .await
        .unwrap();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].id, ack.id);

    // A second resolution attempt is rejected.
    let again = store::proposals::resolve(&mut tx, proposal.id, ProposalStatus::Approved).await;
    assert!(again.is_err());

    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database
async fn test_force_publish_breaking_change() {
    let (db, settings) = setup().await;
    let mut tx = db.pool().begin().await.unwrap();
    let fqn = unique_fqn("warehouse.analytics");
    let (team_id, asset_id) = create_team_and_asset(&mut tx, &fqn).await;

    publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(customer_schema(), Some("1.0.0"), false),
        &settings,
    )
    .await
    .unwrap();

    let without_email = json!({
        "type": "object",
        "properties": {"customer_id": {"type": "integer"}},
        "required": ["customer_id"]
    });
    let outcome = publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(without_email, Some("2.0.0"), true),
        &settings,
    )
    .await
    .unwrap();

    match outcome {
        PublishOutcome::ForcePublished {
            contract, breaking, ..
        } => {
            assert_eq!(contract.version, "2.0.0");
            assert!(!breaking.is_empty());
        }
        other => panic!("expected ForcePublished, got {other:?}"),
    }

    let (events, _) = store::audit::list(
        &mut tx,
        store::audit::AuditFilter {
            action: Some(audit::AuditAction::ContractForcePublished.as_str()),
            ..Default::default()
        },
        Page::new(10, 0),
    )
    .await
    .unwrap();
    assert!(!events.is_empty());
    assert!(events[0].payload.get("breaking_changes").is_some());

    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database
async fn test_equal_version_rejected() {
    let (db, settings) = setup().await;
    let mut tx = db.pool().begin().await.unwrap();
    let fqn = unique_fqn("warehouse.analytics");
    let (team_id, asset_id) = create_team_and_asset(&mut tx, &fqn).await;

    publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(customer_schema(), Some("1.0.0"), false),
        &settings,
    )
    .await
    .unwrap();

    let err = publish(
        &mut tx,
        asset_id,
        team_id,
        publish_request(customer_schema(), Some("1.0.0"), false),
        &settings,
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_VERSION");

    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires database
async fn test_impact_across_two_hops() {
    let (db, settings) = setup().await;
    let mut tx = db.pool().begin().await.unwrap();

    let (producer, asset_a) =
        create_team_and_asset(&mut tx, &unique_fqn("warehouse.hop")).await;
    let (_, asset_b) = create_team_and_asset(&mut tx, &unique_fqn("warehouse.hop")).await;
    let (_, asset_c) = create_team_and_asset(&mut tx, &unique_fqn("warehouse.hop")).await;
    let t1 = store::teams::insert(&mut tx, &format!("t1-{}", Uuid::new_v4()), &json!({}))
        .await
        .unwrap();
    let t2 = store::teams::insert(&mut tx, &format!("t2-{}", Uuid::new_v4()), &json!({}))
        .await
        .unwrap();

    // B consumes A; C consumes B.
    store::dependencies::insert(
        &mut tx,
        asset_b,
        asset_a,
        tessera_registry::models::enums::DependencyType::Consumes,
    )
    .await
    .unwrap();
    store::dependencies::insert(
        &mut tx,
        asset_c,
        asset_b,
        tessera_registry::models::enums::DependencyType::Consumes,
    )
    .await
    .unwrap();

    let contract_a = match publish(
        &mut tx,
        asset_a,
        producer,
        publish_request(customer_schema(), None, false),
        &settings,
    )
    .await
    .unwrap()
    {
        PublishOutcome::Published { contract, .. } => contract,
        other => panic!("expected Published, got {other:?}"),
    };
    let contract_b = match publish(
        &mut tx,
        asset_b,
        producer,
        publish_request(customer_schema(), None, false),
        &settings,
    )
    .await
    .unwrap()
    {
        PublishOutcome::Published { contract, .. } => contract,
        other => panic!("expected Published, got {other:?}"),
    };

    store::registrations::insert(&mut tx, contract_a.id, t1.id, None)
        .await
        .unwrap();
    store::registrations::insert(&mut tx, contract_b.id, t2.id, None)
        .await
        .unwrap();

    let drop_column = json!({
        "type": "object",
        "properties": {"customer_id": {"type": "integer"}},
        "required": ["customer_id"]
    });
    let analysis = impact::analyze_impact(
        &mut tx,
        asset_a,
        &drop_column,
        3,
        &settings.schema_limits(),
    )
    .await
    .unwrap();

    assert!(!analysis.safe_to_publish);
    let by_team: std::collections::HashMap<_, _> = analysis
        .impacted_consumers
        .iter()
        .map(|c| (c.team_id, c.depth))
        .collect();
    assert_eq!(by_team.get(&t1.id), Some(&1));
    assert_eq!(by_team.get(&t2.id), Some(&2));

    let impacted_ids: Vec<_> = analysis.impacted_assets.iter().map(|a| a.asset_id).collect();
    assert!(impacted_ids.contains(&asset_b));
    assert!(impacted_ids.contains(&asset_c));
    assert!(!impacted_ids.contains(&asset_a));

    tx.rollback().await.unwrap();
}

//! Downstream impact traversal.
//!
//! Bounded-depth breadth-first walk over asset-to-asset dependency edges and
//! contract registrations, enumerating who is affected by a proposed schema
//! change. Iterative with an explicit queue; the visited set makes cycles
//! safe and the depth cap bounds the walk.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use tessera_engine::{
    breaking_changes, diff_schemas, validate_schema, ChangeRecord, ChangeType, SchemaLimits,
};

use crate::error::Result;
use crate::models::enums::RegistrationStatus;
use crate::store;

#[derive(Debug, Clone, Serialize)]
pub struct ImpactedConsumer {
    pub team_id: Uuid,
    pub team_name: String,
    pub status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_version: Option<String>,
    /// BFS level at which the consumer was first discovered, root = 1.
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactedAsset {
    pub asset_id: Uuid,
    pub fqn: String,
    pub dependency_type: crate::models::enums::DependencyType,
    pub depth: u32,
}

#[derive(Debug, Serialize)]
pub struct ImpactAnalysis {
    pub change_type: ChangeType,
    pub breaking_changes: Vec<ChangeRecord>,
    pub impacted_consumers: Vec<ImpactedConsumer>,
    pub impacted_assets: Vec<ImpactedAsset>,
    pub safe_to_publish: bool,
    pub traversal_depth: u32,
}

/// Analyze the blast radius of publishing `proposed_schema` to `asset_id`.
pub async fn analyze_impact(
    conn: &mut PgConnection,
    asset_id: Uuid,
    proposed_schema: &Value,
    depth: u32,
    limits: &SchemaLimits,
) -> Result<ImpactAnalysis> {
    validate_schema(proposed_schema, limits)?;
    store::assets::get(conn, asset_id).await?;

    let Some(current) = store::contracts::active_for_asset(conn, asset_id).await? else {
        // First contract: nothing downstream can depend on it yet.
        return Ok(ImpactAnalysis {
            change_type: ChangeType::Minor,
            breaking_changes: Vec::new(),
            impacted_consumers: Vec::new(),
            impacted_assets: Vec::new(),
            safe_to_publish: true,
            traversal_depth: depth,
        });
    };

    let diff = diff_schemas(&current.schema_def, proposed_schema);
    let breaking = breaking_changes(&diff, current.compatibility_mode);

    let mut visited: HashSet<Uuid> = HashSet::new();
    let mut discovered: HashSet<Uuid> = HashSet::new();
    let mut consumers: HashMap<Uuid, ImpactedConsumer> = HashMap::new();
    let mut impacted_assets: Vec<ImpactedAsset> = Vec::new();
    let mut queue: VecDeque<(Uuid, u32)> = VecDeque::new();
    queue.push_back((asset_id, 1));
    discovered.insert(asset_id);

    while let Some((current_id, level)) = queue.pop_front() {
        if level > depth || !visited.insert(current_id) {
            continue;
        }

        if let Some(contract) = store::contracts::active_for_asset(conn, current_id).await? {
            for (registration, team_name) in
                store::registrations::list_active_with_team(conn, contract.id).await?
            {
                consumers
                    .entry(registration.consumer_team_id)
                    .or_insert(ImpactedConsumer {
                        team_id: registration.consumer_team_id,
                        team_name,
                        status: registration.status,
                        pinned_version: registration.pinned_version,
                        depth: level,
                    });
            }
        }

        for edge in store::dependencies::downstream_of(conn, current_id).await? {
            if discovered.insert(edge.asset_id) {
                impacted_assets.push(ImpactedAsset {
                    asset_id: edge.asset_id,
                    fqn: edge.fqn,
                    dependency_type: edge.dependency_type,
                    depth: level,
                });
                queue.push_back((edge.asset_id, level + 1));
            }
        }
    }

    let mut impacted_consumers: Vec<ImpactedConsumer> = consumers.into_values().collect();
    impacted_consumers.sort_by(|a, b| a.depth.cmp(&b.depth).then(a.team_name.cmp(&b.team_name)));

    Ok(ImpactAnalysis {
        change_type: diff.change_type,
        safe_to_publish: breaking.is_empty(),
        breaking_changes: breaking,
        impacted_consumers,
        impacted_assets,
        traversal_depth: depth,
    })
}

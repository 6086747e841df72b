//! Asset dependency edges.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{map_constraint_violation, ConstraintContext, RegistryError, Result};
use crate::models::enums::DependencyType;
use crate::models::AssetDependency;
use crate::store::parse_enum;

fn from_row(row: &PgRow) -> Result<AssetDependency> {
    let dependency_type: String = row.try_get("dependency_type")?;
    Ok(AssetDependency {
        id: row.try_get("id")?,
        dependent_asset_id: row.try_get("dependent_asset_id")?,
        dependency_asset_id: row.try_get("dependency_asset_id")?,
        dependency_type: parse_enum(&dependency_type)?,
        created_at: row.try_get("created_at")?,
    })
}

const COLUMNS: &str = "id, dependent_asset_id, dependency_asset_id, dependency_type, created_at";

/// One hop of lineage, joined with the neighbouring asset.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DependencyEdge {
    pub asset_id: Uuid,
    pub fqn: String,
    pub dependency_type: DependencyType,
    pub owner_team_id: Uuid,
}

pub async fn insert(
    conn: &mut PgConnection,
    dependent_asset_id: Uuid,
    dependency_asset_id: Uuid,
    dependency_type: DependencyType,
) -> Result<AssetDependency> {
    if dependent_asset_id == dependency_asset_id {
        return Err(RegistryError::SelfDependency);
    }
    let row = sqlx::query(&format!(
        "INSERT INTO dependencies (id, dependent_asset_id, dependency_asset_id, dependency_type) \
         VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(dependent_asset_id)
    .bind(dependency_asset_id)
    .bind(dependency_type.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new("")))?;
    from_row(&row)
}

pub async fn delete(conn: &mut PgConnection, asset_id: Uuid, dependency_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM dependencies WHERE id = $1 AND dependent_asset_id = $2")
        .bind(dependency_id)
        .bind(asset_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RegistryError::DependencyNotFound(dependency_id));
    }
    Ok(())
}

/// Upstream edges: assets this asset reads from.
pub async fn upstream_of(conn: &mut PgConnection, asset_id: Uuid) -> Result<Vec<DependencyEdge>> {
    let rows = sqlx::query(
        "SELECT a.id AS asset_id, a.fqn, d.dependency_type, a.owner_team_id \
         FROM dependencies d JOIN assets a ON d.dependency_asset_id = a.id \
         WHERE d.dependent_asset_id = $1 ORDER BY a.fqn",
    )
    .bind(asset_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(edge_from_row).collect()
}

/// Downstream edges: assets that read from this asset.
pub async fn downstream_of(conn: &mut PgConnection, asset_id: Uuid) -> Result<Vec<DependencyEdge>> {
    let rows = sqlx::query(
        "SELECT a.id AS asset_id, a.fqn, d.dependency_type, a.owner_team_id \
         FROM dependencies d JOIN assets a ON d.dependent_asset_id = a.id \
         WHERE d.dependency_asset_id = $1 ORDER BY a.fqn",
    )
    .bind(asset_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(edge_from_row).collect()
}

fn edge_from_row(row: &PgRow) -> Result<DependencyEdge> {
    let dependency_type: String = row.try_get("dependency_type")?;
    Ok(DependencyEdge {
        asset_id: row.try_get("asset_id")?,
        fqn: row.try_get("fqn")?,
        dependency_type: parse_enum(&dependency_type)?,
        owner_team_id: row.try_get("owner_team_id")?,
    })
}

/// Raw upstream dependency rows for an asset.
pub async fn list_for_asset(
    conn: &mut PgConnection,
    asset_id: Uuid,
) -> Result<Vec<AssetDependency>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM dependencies WHERE dependent_asset_id = $1 ORDER BY created_at"
    ))
    .bind(asset_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(from_row).collect()
}

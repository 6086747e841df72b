//! Asset persistence.

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{map_constraint_violation, ConstraintContext, RegistryError, Result};
use crate::models::enums::{GuaranteeMode, ResourceType};
use crate::models::Asset;
use crate::store::{parse_enum, Page};

fn from_row(row: &PgRow) -> Result<Asset> {
    let resource_type: String = row.try_get("resource_type")?;
    let guarantee_mode: String = row.try_get("guarantee_mode")?;
    Ok(Asset {
        id: row.try_get("id")?,
        fqn: row.try_get("fqn")?,
        owner_team_id: row.try_get("owner_team_id")?,
        owner_user_id: row.try_get("owner_user_id")?,
        environment: row.try_get("environment")?,
        resource_type: parse_enum(&resource_type)?,
        guarantee_mode: parse_enum(&guarantee_mode)?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

const COLUMNS: &str = "id, fqn, owner_team_id, owner_user_id, environment, resource_type, \
                       guarantee_mode, metadata, created_at, deleted_at";

pub struct NewAsset<'a> {
    pub fqn: &'a str,
    pub owner_team_id: Uuid,
    pub owner_user_id: Option<Uuid>,
    pub environment: &'a str,
    pub resource_type: ResourceType,
    pub guarantee_mode: GuaranteeMode,
    pub metadata: &'a Value,
}

pub async fn insert(conn: &mut PgConnection, asset: NewAsset<'_>) -> Result<Asset> {
    let row = sqlx::query(&format!(
        "INSERT INTO assets (id, fqn, owner_team_id, owner_user_id, environment, resource_type, \
                             guarantee_mode, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(asset.fqn)
    .bind(asset.owner_team_id)
    .bind(asset.owner_user_id)
    .bind(asset.environment)
    .bind(asset.resource_type.as_str())
    .bind(asset.guarantee_mode.as_str())
    .bind(asset.metadata)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new(asset.fqn)))?;
    from_row(&row)
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Asset> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM assets WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::AssetNotFound(id)),
    }
}

pub async fn list(
    conn: &mut PgConnection,
    owner_team_id: Option<Uuid>,
    page: Page,
) -> Result<(Vec<Asset>, i64)> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assets \
         WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR owner_team_id = $1)",
    )
    .bind(owner_team_id)
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM assets \
         WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR owner_team_id = $1) \
         ORDER BY fqn LIMIT $2 OFFSET $3"
    ))
    .bind(owner_team_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&mut *conn)
    .await?;

    let assets = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
    Ok((assets, total))
}

pub struct AssetUpdate<'a> {
    pub fqn: Option<&'a str>,
    pub owner_team_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
    pub environment: Option<&'a str>,
    pub resource_type: Option<ResourceType>,
    pub guarantee_mode: Option<GuaranteeMode>,
    pub metadata: Option<&'a Value>,
}

pub async fn update(conn: &mut PgConnection, id: Uuid, update: AssetUpdate<'_>) -> Result<Asset> {
    let row = sqlx::query(&format!(
        "UPDATE assets SET \
             fqn = COALESCE($2, fqn), \
             owner_team_id = COALESCE($3, owner_team_id), \
             owner_user_id = COALESCE($4, owner_user_id), \
             environment = COALESCE($5, environment), \
             resource_type = COALESCE($6, resource_type), \
             guarantee_mode = COALESCE($7, guarantee_mode), \
             metadata = COALESCE($8, metadata) \
         WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(update.fqn)
    .bind(update.owner_team_id)
    .bind(update.owner_user_id)
    .bind(update.environment)
    .bind(update.resource_type.map(|r| r.as_str()))
    .bind(update.guarantee_mode.map(|g| g.as_str()))
    .bind(update.metadata)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new(update.fqn.unwrap_or(""))))?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::AssetNotFound(id)),
    }
}

//! Contract persistence.

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{map_constraint_violation, ConstraintContext, RegistryError, Result};
use crate::models::enums::ContractStatus;
use crate::models::{CompatibilityMode, Contract};
use crate::store::{parse_enum, Page};

fn from_row(row: &PgRow) -> Result<Contract> {
    let compatibility_mode: String = row.try_get("compatibility_mode")?;
    let status: String = row.try_get("status")?;
    Ok(Contract {
        id: row.try_get("id")?,
        asset_id: row.try_get("asset_id")?,
        version: row.try_get("version")?,
        schema_def: row.try_get("schema_def")?,
        compatibility_mode: parse_enum(&compatibility_mode)?,
        guarantees: row.try_get("guarantees")?,
        status: parse_enum(&status)?,
        published_at: row.try_get("published_at")?,
        published_by: row.try_get("published_by")?,
    })
}

const COLUMNS: &str = "id, asset_id, version, schema_def, compatibility_mode, guarantees, \
                       status, published_at, published_by";

pub struct NewContract<'a> {
    pub asset_id: Uuid,
    pub version: &'a str,
    pub schema_def: &'a Value,
    pub compatibility_mode: CompatibilityMode,
    pub guarantees: Option<&'a Value>,
    pub published_by: Uuid,
}

pub async fn insert(conn: &mut PgConnection, contract: NewContract<'_>) -> Result<Contract> {
    let row = sqlx::query(&format!(
        "INSERT INTO contracts (id, asset_id, version, schema_def, compatibility_mode, \
                                guarantees, published_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(contract.asset_id)
    .bind(contract.version)
    .bind(contract.schema_def)
    .bind(contract.compatibility_mode.as_str())
    .bind(contract.guarantees)
    .bind(contract.published_by)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new(contract.version)))?;
    from_row(&row)
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Contract> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM contracts WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::ContractNotFound(id)),
    }
}

/// The single active contract of an asset, if any.
pub async fn active_for_asset(conn: &mut PgConnection, asset_id: Uuid) -> Result<Option<Contract>> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM contracts WHERE asset_id = $1 AND status = 'active' LIMIT 1"
    ))
    .bind(asset_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Full version history of an asset, oldest first.
pub async fn list_for_asset(conn: &mut PgConnection, asset_id: Uuid) -> Result<Vec<Contract>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM contracts WHERE asset_id = $1 ORDER BY published_at"
    ))
    .bind(asset_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(from_row).collect()
}

pub async fn list(
    conn: &mut PgConnection,
    asset_id: Option<Uuid>,
    status: Option<ContractStatus>,
    version_pattern: Option<&str>,
    page: Page,
) -> Result<(Vec<Contract>, i64)> {
    let pattern = version_pattern.map(|v| format!("%{v}%"));
    let status = status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM contracts \
         WHERE ($1::uuid IS NULL OR asset_id = $1) \
           AND ($2::text IS NULL OR status = $2) \
           AND ($3::text IS NULL OR version ILIKE $3)",
    )
    .bind(asset_id)
    .bind(status)
    .bind(pattern.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM contracts \
         WHERE ($1::uuid IS NULL OR asset_id = $1) \
           AND ($2::text IS NULL OR status = $2) \
           AND ($3::text IS NULL OR version ILIKE $3) \
         ORDER BY published_at DESC LIMIT $4 OFFSET $5"
    ))
    .bind(asset_id)
    .bind(status)
    .bind(pattern.as_deref())
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&mut *conn)
    .await?;

    let contracts = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
    Ok((contracts, total))
}

/// Move a contract out of `active`.
pub async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: ContractStatus,
) -> Result<Contract> {
    let row = sqlx::query(&format!(
        "UPDATE contracts SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::ContractNotFound(id)),
    }
}

pub async fn update_guarantees(
    conn: &mut PgConnection,
    id: Uuid,
    guarantees: &Value,
) -> Result<Contract> {
    let row = sqlx::query(&format!(
        "UPDATE contracts SET guarantees = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(guarantees)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::ContractNotFound(id)),
    }
}

/// All contract ids of an asset, for registration fan-out queries.
pub async fn ids_for_asset(conn: &mut PgConnection, asset_id: Uuid) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar("SELECT id FROM contracts WHERE asset_id = $1")
        .bind(asset_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

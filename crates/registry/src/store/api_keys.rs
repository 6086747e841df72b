//! API key persistence.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::models::enums::ApiScope;
use crate::models::{ApiKey, Team};

fn from_row(row: &PgRow) -> Result<ApiKey> {
    let scopes: serde_json::Value = row.try_get("scopes")?;
    let scopes: Vec<ApiScope> = serde_json::from_value(scopes)
        .map_err(|_| RegistryError::Internal("unexpected scope list in database".to_string()))?;
    Ok(ApiKey {
        id: row.try_get("id")?,
        key_hash: row.try_get("key_hash")?,
        key_prefix: row.try_get("key_prefix")?,
        name: row.try_get("name")?,
        team_id: row.try_get("team_id")?,
        scopes,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
        last_used_at: row.try_get("last_used_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

const COLUMNS: &str = "id, key_hash, key_prefix, name, team_id, scopes, created_at, \
                       expires_at, last_used_at, revoked_at";

pub struct NewApiKey<'a> {
    pub key_hash: &'a str,
    pub key_prefix: &'a str,
    pub name: &'a str,
    pub team_id: Uuid,
    pub scopes: &'a [ApiScope],
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn insert(conn: &mut PgConnection, key: NewApiKey<'_>) -> Result<ApiKey> {
    let scopes = serde_json::to_value(key.scopes)
        .map_err(|e| RegistryError::Internal(e.to_string()))?;
    let row = sqlx::query(&format!(
        "INSERT INTO api_keys (id, key_hash, key_prefix, name, team_id, scopes, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(key.key_hash)
    .bind(key.key_prefix)
    .bind(key.name)
    .bind(key.team_id)
    .bind(&scopes)
    .bind(key.expires_at)
    .fetch_one(&mut *conn)
    .await?;
    from_row(&row)
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<ApiKey> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM api_keys WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::ApiKeyNotFound(id)),
    }
}

pub async fn list(
    conn: &mut PgConnection,
    team_id: Option<Uuid>,
    include_revoked: bool,
) -> Result<Vec<ApiKey>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM api_keys \
         WHERE ($1::uuid IS NULL OR team_id = $1) AND ($2 OR revoked_at IS NULL) \
         ORDER BY created_at DESC"
    ))
    .bind(team_id)
    .bind(include_revoked)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Live candidate keys sharing a prefix, joined with their team. The salted
/// hash cannot be looked up directly, so verification iterates these.
pub async fn candidates_by_prefix(
    conn: &mut PgConnection,
    key_prefix: &str,
    now: DateTime<Utc>,
) -> Result<Vec<(ApiKey, Team)>> {
    let rows = sqlx::query(
        "SELECT k.id, k.key_hash, k.key_prefix, k.name, k.team_id, k.scopes, k.created_at, \
                k.expires_at, k.last_used_at, k.revoked_at, \
                t.id AS t_id, t.name AS t_name, t.metadata AS t_metadata, \
                t.created_at AS t_created_at, t.deleted_at AS t_deleted_at \
         FROM api_keys k JOIN teams t ON k.team_id = t.id \
         WHERE k.key_prefix = $1 AND k.revoked_at IS NULL \
           AND (k.expires_at IS NULL OR k.expires_at > $2) \
           AND t.deleted_at IS NULL",
    )
    .bind(key_prefix)
    .bind(now)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let key = from_row(row)?;
            let team = Team {
                id: row.try_get("t_id")?,
                name: row.try_get("t_name")?,
                metadata: row.try_get("t_metadata")?,
                created_at: row.try_get("t_created_at")?,
                deleted_at: row.try_get("t_deleted_at")?,
            };
            Ok((key, team))
        })
        .collect()
}

/// Best-effort usage stamp; callers may fire-and-forget.
pub async fn touch_last_used(conn: &mut PgConnection, id: Uuid, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Revoke a key. Already-revoked keys are returned unchanged, so revocation
/// is idempotent.
pub async fn revoke(conn: &mut PgConnection, id: Uuid, now: DateTime<Utc>) -> Result<ApiKey> {
    let existing = get(conn, id).await?;
    if existing.revoked_at.is_some() {
        return Ok(existing);
    }
    let row = sqlx::query(&format!(
        "UPDATE api_keys SET revoked_at = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    from_row(&row)
}

//! Team persistence.

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{map_constraint_violation, ConstraintContext, RegistryError, Result};
use crate::models::Team;
use crate::store::Page;

fn from_row(row: &PgRow) -> Result<Team> {
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

const COLUMNS: &str = "id, name, metadata, created_at, deleted_at";

pub async fn insert(conn: &mut PgConnection, name: &str, metadata: &Value) -> Result<Team> {
    let row = sqlx::query(&format!(
        "INSERT INTO teams (id, name, metadata) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(metadata)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new(name)))?;
    from_row(&row)
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Team> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM teams WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::TeamNotFound(id)),
    }
}

/// First team by creation time; the team the bootstrap key binds to.
pub async fn first(conn: &mut PgConnection) -> Result<Option<Team>> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM teams WHERE deleted_at IS NULL ORDER BY created_at LIMIT 1"
    ))
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn list(
    conn: &mut PgConnection,
    name_filter: Option<&str>,
    page: Page,
) -> Result<(Vec<Team>, i64)> {
    let pattern = name_filter.map(|n| format!("%{n}%"));

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM teams WHERE deleted_at IS NULL AND ($1::text IS NULL OR name ILIKE $1)",
    )
    .bind(pattern.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM teams \
         WHERE deleted_at IS NULL AND ($1::text IS NULL OR name ILIKE $1) \
         ORDER BY name LIMIT $2 OFFSET $3"
    ))
    .bind(pattern.as_deref())
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&mut *conn)
    .await?;

    let teams = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
    Ok((teams, total))
}

pub async fn update(
    conn: &mut PgConnection,
    id: Uuid,
    name: Option<&str>,
    metadata: Option<&Value>,
) -> Result<Team> {
    let row = sqlx::query(&format!(
        "UPDATE teams SET name = COALESCE($2, name), metadata = COALESCE($3, metadata) \
         WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(metadata)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new(name.unwrap_or(""))))?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::TeamNotFound(id)),
    }
}

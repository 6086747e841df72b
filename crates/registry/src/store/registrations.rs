//! Consumer registration persistence.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{map_constraint_violation, ConstraintContext, RegistryError, Result};
use crate::models::enums::RegistrationStatus;
use crate::models::Registration;
use crate::store::{parse_enum, Page};

fn from_row(row: &PgRow) -> Result<Registration> {
    let status: String = row.try_get("status")?;
    Ok(Registration {
        id: row.try_get("id")?,
        contract_id: row.try_get("contract_id")?,
        consumer_team_id: row.try_get("consumer_team_id")?,
        pinned_version: row.try_get("pinned_version")?,
        status: parse_enum(&status)?,
        registered_at: row.try_get("registered_at")?,
        acknowledged_at: row.try_get("acknowledged_at")?,
    })
}

const COLUMNS: &str = "id, contract_id, consumer_team_id, pinned_version, status, \
                       registered_at, acknowledged_at";

pub async fn insert(
    conn: &mut PgConnection,
    contract_id: Uuid,
    consumer_team_id: Uuid,
    pinned_version: Option<&str>,
) -> Result<Registration> {
    let row = sqlx::query(&format!(
        "INSERT INTO registrations (id, contract_id, consumer_team_id, pinned_version) \
         VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(contract_id)
    .bind(consumer_team_id)
    .bind(pinned_version)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new("")))?;
    from_row(&row)
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Registration> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM registrations WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::RegistrationNotFound(id)),
    }
}

pub async fn list_for_contract(
    conn: &mut PgConnection,
    contract_id: Uuid,
    page: Page,
) -> Result<(Vec<Registration>, i64)> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE contract_id = $1")
            .bind(contract_id)
            .fetch_one(&mut *conn)
            .await?;

    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM registrations WHERE contract_id = $1 \
         ORDER BY registered_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(contract_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&mut *conn)
    .await?;

    let registrations = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
    Ok((registrations, total))
}

/// Active registrations on a contract joined with the consumer team name,
/// for impact traversal.
pub async fn list_active_with_team(
    conn: &mut PgConnection,
    contract_id: Uuid,
) -> Result<Vec<(Registration, String)>> {
    let rows = sqlx::query(
        "SELECT r.id, r.contract_id, r.consumer_team_id, r.pinned_version, r.status, \
                r.registered_at, r.acknowledged_at, t.name AS team_name \
         FROM registrations r JOIN teams t ON r.consumer_team_id = t.id \
         WHERE r.contract_id = $1 AND r.status = 'active'",
    )
    .bind(contract_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter()
        .map(|row| {
            let registration = from_row(row)?;
            let team_name: String = row.try_get("team_name")?;
            Ok((registration, team_name))
        })
        .collect()
}

/// Registrations on any contract of the given contracts, for lineage.
pub async fn list_for_contracts(
    conn: &mut PgConnection,
    contract_ids: &[Uuid],
) -> Result<Vec<Registration>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM registrations WHERE contract_id = ANY($1)"
    ))
    .bind(contract_ids)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(from_row).collect()
}

pub async fn update(
    conn: &mut PgConnection,
    id: Uuid,
    status: Option<RegistrationStatus>,
    pinned_version: Option<&str>,
) -> Result<Registration> {
    let row = sqlx::query(&format!(
        "UPDATE registrations SET \
             status = COALESCE($2, status), \
             pinned_version = COALESCE($3, pinned_version), \
             acknowledged_at = now() \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(status.map(|s| s.as_str()))
    .bind(pinned_version)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::RegistrationNotFound(id)),
    }
}

pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RegistryError::RegistrationNotFound(id));
    }
    Ok(())
}

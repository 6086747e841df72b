//! Proposal and acknowledgment persistence.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{map_constraint_violation, ConstraintContext, RegistryError, Result};
use crate::models::enums::ProposalStatus;
use crate::models::{AckResponse, Acknowledgment, ChangeType, Proposal};
use crate::store::{parse_enum, Page};

fn proposal_from_row(row: &PgRow) -> Result<Proposal> {
    let change_type: String = row.try_get("change_type")?;
    let status: String = row.try_get("status")?;
    Ok(Proposal {
        id: row.try_get("id")?,
        asset_id: row.try_get("asset_id")?,
        proposed_schema: row.try_get("proposed_schema")?,
        change_type: parse_enum(&change_type)?,
        breaking_changes: row.try_get("breaking_changes")?,
        status: parse_enum(&status)?,
        proposed_by: row.try_get("proposed_by")?,
        proposed_at: row.try_get("proposed_at")?,
        resolved_at: row.try_get("resolved_at")?,
        expires_at: row.try_get("expires_at")?,
        auto_expire: row.try_get("auto_expire")?,
    })
}

fn ack_from_row(row: &PgRow) -> Result<Acknowledgment> {
    let response: String = row.try_get("response")?;
    Ok(Acknowledgment {
        id: row.try_get("id")?,
        proposal_id: row.try_get("proposal_id")?,
        consumer_team_id: row.try_get("consumer_team_id")?,
        response: parse_enum(&response)?,
        migration_deadline: row.try_get("migration_deadline")?,
        notes: row.try_get("notes")?,
        responded_at: row.try_get("responded_at")?,
    })
}

const COLUMNS: &str = "id, asset_id, proposed_schema, change_type, breaking_changes, status, \
                       proposed_by, proposed_at, resolved_at, expires_at, auto_expire";

const ACK_COLUMNS: &str =
    "id, proposal_id, consumer_team_id, response, migration_deadline, notes, responded_at";

pub struct NewProposal<'a> {
    pub asset_id: Uuid,
    pub proposed_schema: &'a Value,
    pub change_type: ChangeType,
    pub breaking_changes: &'a Value,
    pub proposed_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_expire: bool,
}

pub async fn insert(conn: &mut PgConnection, proposal: NewProposal<'_>) -> Result<Proposal> {
    let row = sqlx::query(&format!(
        "INSERT INTO proposals (id, asset_id, proposed_schema, change_type, breaking_changes, \
                                proposed_by, expires_at, auto_expire) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(proposal.asset_id)
    .bind(proposal.proposed_schema)
    .bind(proposal.change_type.as_str())
    .bind(proposal.breaking_changes)
    .bind(proposal.proposed_by)
    .bind(proposal.expires_at)
    .bind(proposal.auto_expire)
    .fetch_one(&mut *conn)
    .await?;
    proposal_from_row(&row)
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Proposal> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM proposals WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => proposal_from_row(&row),
        None => Err(RegistryError::ProposalNotFound(id)),
    }
}

pub async fn list(
    conn: &mut PgConnection,
    asset_id: Option<Uuid>,
    status: Option<ProposalStatus>,
    page: Page,
) -> Result<(Vec<Proposal>, i64)> {
    let status = status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM proposals \
         WHERE ($1::uuid IS NULL OR asset_id = $1) AND ($2::text IS NULL OR status = $2)",
    )
    .bind(asset_id)
    .bind(status)
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM proposals \
         WHERE ($1::uuid IS NULL OR asset_id = $1) AND ($2::text IS NULL OR status = $2) \
         ORDER BY proposed_at DESC LIMIT $3 OFFSET $4"
    ))
    .bind(asset_id)
    .bind(status)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&mut *conn)
    .await?;

    let proposals = rows.iter().map(proposal_from_row).collect::<Result<Vec<_>>>()?;
    Ok((proposals, total))
}

/// All pending proposals, for the expiration sweep.
pub async fn list_pending(conn: &mut PgConnection) -> Result<Vec<Proposal>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM proposals WHERE status = 'pending' ORDER BY proposed_at"
    ))
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(proposal_from_row).collect()
}

/// Take a pending proposal to a terminal state, stamping `resolved_at`.
///
/// Fails with `PROPOSAL_NOT_PENDING` when the proposal has already left
/// `pending`, so concurrent resolutions cannot double-fire.
pub async fn resolve(
    conn: &mut PgConnection,
    id: Uuid,
    status: ProposalStatus,
) -> Result<Proposal> {
    let row = sqlx::query(&format!(
        "UPDATE proposals SET status = $2, resolved_at = now() \
         WHERE id = $1 AND status = 'pending' RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => proposal_from_row(&row),
        None => {
            let current = get(conn, id).await?;
            Err(RegistryError::ProposalNotPending(
                current.status.as_str().to_string(),
            ))
        }
    }
}

pub async fn insert_acknowledgment(
    conn: &mut PgConnection,
    proposal_id: Uuid,
    consumer_team_id: Uuid,
    response: AckResponse,
    migration_deadline: Option<DateTime<Utc>>,
    notes: Option<&str>,
) -> Result<Acknowledgment> {
    let row = sqlx::query(&format!(
        "INSERT INTO acknowledgments (id, proposal_id, consumer_team_id, response, \
                                      migration_deadline, notes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ACK_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(proposal_id)
    .bind(consumer_team_id)
    .bind(response.as_str())
    .bind(migration_deadline)
    .bind(notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_constraint_violation(e, ConstraintContext::new("")))?;
    ack_from_row(&row)
}

pub async fn list_acknowledgments(
    conn: &mut PgConnection,
    proposal_id: Uuid,
) -> Result<Vec<Acknowledgment>> {
    let rows = sqlx::query(&format!(
        "SELECT {ACK_COLUMNS} FROM acknowledgments WHERE proposal_id = $1 ORDER BY responded_at"
    ))
    .bind(proposal_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(ack_from_row).collect()
}

//! Audit event persistence. Insert and query only; there is no update or
//! delete path.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::AuditEvent;
use crate::store::Page;

fn from_row(row: &PgRow) -> Result<AuditEvent> {
    Ok(AuditEvent {
        id: row.try_get("id")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        action: row.try_get("action")?,
        actor_id: row.try_get("actor_id")?,
        payload: row.try_get("payload")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

const COLUMNS: &str = "id, entity_type, entity_id, action, actor_id, payload, occurred_at";

pub async fn insert(
    conn: &mut PgConnection,
    entity_type: &str,
    entity_id: Uuid,
    action: &str,
    actor_id: Option<Uuid>,
    payload: &Value,
) -> Result<AuditEvent> {
    let row = sqlx::query(&format!(
        "INSERT INTO audit_events (id, entity_type, entity_id, action, actor_id, payload) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(entity_type)
    .bind(entity_id)
    .bind(action)
    .bind(actor_id)
    .bind(payload)
    .fetch_one(&mut *conn)
    .await?;
    from_row(&row)
}

/// Filters for the audit query endpoint.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter<'a> {
    pub entity_type: Option<&'a str>,
    pub entity_id: Option<Uuid>,
    pub action: Option<&'a str>,
    pub actor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list(
    conn: &mut PgConnection,
    filter: AuditFilter<'_>,
    page: Page,
) -> Result<(Vec<AuditEvent>, i64)> {
    const WHERE_CLAUSE: &str = "($1::text IS NULL OR entity_type = $1) \
         AND ($2::uuid IS NULL OR entity_id = $2) \
         AND ($3::text IS NULL OR action = $3) \
         AND ($4::uuid IS NULL OR actor_id = $4) \
         AND ($5::timestamptz IS NULL OR occurred_at >= $5) \
         AND ($6::timestamptz IS NULL OR occurred_at <= $6)";

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM audit_events WHERE {WHERE_CLAUSE}"
    ))
    .bind(filter.entity_type)
    .bind(filter.entity_id)
    .bind(filter.action)
    .bind(filter.actor_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_one(&mut *conn)
    .await?;

    // seq breaks occurred_at ties in insertion order.
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM audit_events WHERE {WHERE_CLAUSE} \
         ORDER BY occurred_at DESC, seq DESC LIMIT $7 OFFSET $8"
    ))
    .bind(filter.entity_type)
    .bind(filter.entity_id)
    .bind(filter.action)
    .bind(filter.actor_id)
    .bind(filter.from)
    .bind(filter.to)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&mut *conn)
    .await?;

    let events = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
    Ok((events, total))
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Option<AuditEvent>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM audit_events WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(from_row).transpose()
}

//! Webhook delivery persistence.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::models::enums::DeliveryStatus;
use crate::models::WebhookDelivery;
use crate::store::{parse_enum, Page};

fn from_row(row: &PgRow) -> Result<WebhookDelivery> {
    let status: String = row.try_get("status")?;
    Ok(WebhookDelivery {
        id: row.try_get::<Uuid, _>("id")?,
        event_type: row.try_get::<String, _>("event_type")?,
        payload: row.try_get::<Value, _>("payload")?,
        url: row.try_get::<String, _>("url")?,
        status: parse_enum(&status)?,
        attempts: row.try_get::<i32, _>("attempts")?,
        last_attempt_at: row.try_get::<Option<DateTime<Utc>>, _>("last_attempt_at")?,
        last_error: row.try_get::<Option<String>, _>("last_error")?,
        last_status_code: row.try_get::<Option<i32>, _>("last_status_code")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        delivered_at: row.try_get::<Option<DateTime<Utc>>, _>("delivered_at")?,
    })
}

const COLUMNS: &str = "id, event_type, payload, url, status, attempts, last_attempt_at, \
                       last_error, last_status_code, created_at, delivered_at";

pub async fn enqueue(
    conn: &mut PgConnection,
    event_type: &str,
    payload: &Value,
    url: &str,
) -> Result<WebhookDelivery> {
    let row = sqlx::query(&format!(
        "INSERT INTO webhook_deliveries (id, event_type, payload, url) \
         VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(event_type)
    .bind(payload)
    .bind(url)
    .fetch_one(&mut *conn)
    .await?;
    from_row(&row)
}

pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<WebhookDelivery> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM webhook_deliveries WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(RegistryError::DeliveryNotFound(id)),
    }
}

pub async fn list(
    conn: &mut PgConnection,
    status: Option<DeliveryStatus>,
    event_type: Option<&str>,
    page: Page,
) -> Result<(Vec<WebhookDelivery>, i64)> {
    let status = status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM webhook_deliveries \
         WHERE ($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR event_type = $2)",
    )
    .bind(status)
    .bind(event_type)
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM webhook_deliveries \
         WHERE ($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR event_type = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4"
    ))
    .bind(status)
    .bind(event_type)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(&mut *conn)
    .await?;

    let deliveries = rows.iter().map(from_row).collect::<Result<Vec<_>>>()?;
    Ok((deliveries, total))
}

/// Pending deliveries that have not exhausted their attempts, oldest first.
pub async fn fetch_pending(
    conn: &mut PgConnection,
    max_attempts: i32,
    limit: i64,
) -> Result<Vec<WebhookDelivery>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM webhook_deliveries \
         WHERE status = 'pending' AND attempts < $1 \
         ORDER BY created_at LIMIT $2"
    ))
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(from_row).collect()
}

pub async fn mark_delivered(
    conn: &mut PgConnection,
    id: Uuid,
    status_code: i32,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE webhook_deliveries \
         SET status = 'delivered', attempts = attempts + 1, last_attempt_at = $2, \
             last_status_code = $3, last_error = NULL, delivered_at = $2 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .bind(status_code)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Record a failed attempt; the row flips to `failed` once the retry cap is
/// reached.
pub async fn mark_failed_attempt(
    conn: &mut PgConnection,
    id: Uuid,
    status_code: Option<i32>,
    error: &str,
    max_attempts: i32,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE webhook_deliveries \
         SET attempts = attempts + 1, last_attempt_at = $2, last_status_code = $3, \
             last_error = $4, \
             status = CASE WHEN attempts + 1 >= $5 THEN 'failed' ELSE 'pending' END \
         WHERE id = $1",
    )
    .bind(id)
    .bind(now)
    .bind(status_code)
    .bind(error)
    .bind(max_attempts)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

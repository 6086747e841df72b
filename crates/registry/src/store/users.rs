//! User lookups for session authentication.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::User;
use crate::store::parse_enum;

fn from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        team_id: row.try_get("team_id")?,
        role: parse_enum(&role)?,
        password_hash: row.try_get("password_hash")?,
        notification_preferences: row.try_get("notification_preferences")?,
        created_at: row.try_get("created_at")?,
        deactivated_at: row.try_get("deactivated_at")?,
    })
}

/// Fetch a user that is still active, or `None`.
pub async fn get_live(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, email, name, team_id, role, password_hash, notification_preferences, \
                created_at, deactivated_at \
         FROM users WHERE id = $1 AND deactivated_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

//! Global substring search across entity types.

use serde::Serialize;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct TeamHit {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserHit {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetHit {
    pub id: Uuid,
    pub fqn: String,
    pub resource_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractHit {
    pub id: Uuid,
    pub version: String,
    pub asset_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub teams: Vec<TeamHit>,
    pub users: Vec<UserHit>,
    pub assets: Vec<AssetHit>,
    pub contracts: Vec<ContractHit>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.teams.len() + self.users.len() + self.assets.len() + self.contracts.len()
    }
}

/// Case-insensitive substring search; `limit` applies per entity type.
/// Soft-deleted rows never match.
pub async fn global(conn: &mut PgConnection, query: &str, limit: i64) -> Result<SearchResults> {
    let pattern = format!("%{query}%");

    let teams = sqlx::query(
        "SELECT id, name FROM teams \
         WHERE deleted_at IS NULL AND name ILIKE $1 ORDER BY name LIMIT $2",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|row| {
        Ok(TeamHit {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    let users = sqlx::query(
        "SELECT id, name, email, team_id FROM users \
         WHERE deactivated_at IS NULL AND (name ILIKE $1 OR email ILIKE $1) \
         ORDER BY name LIMIT $2",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|row| {
        Ok(UserHit {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            team_id: row.try_get("team_id")?,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    let assets = sqlx::query(
        "SELECT id, fqn, resource_type FROM assets \
         WHERE deleted_at IS NULL AND fqn ILIKE $1 ORDER BY fqn LIMIT $2",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|row| {
        Ok(AssetHit {
            id: row.try_get("id")?,
            fqn: row.try_get("fqn")?,
            resource_type: row.try_get("resource_type")?,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    let contracts = sqlx::query(
        "SELECT id, version, asset_id, status FROM contracts \
         WHERE version ILIKE $1 ORDER BY published_at DESC LIMIT $2",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|row| {
        Ok(ContractHit {
            id: row.try_get("id")?,
            version: row.try_get("version")?,
            asset_id: row.try_get("asset_id")?,
            status: row.try_get("status")?,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    Ok(SearchResults {
        teams,
        users,
        assets,
        contracts,
    })
}

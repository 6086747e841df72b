//! Authentication context and the extractor that builds it.
//!
//! Requests authenticate with `Authorization: Bearer <key>` (API key or the
//! process-configured bootstrap key) or, failing that, a signed session
//! cookie referencing a live user. Every mutation endpoint then checks a
//! required scope and, where a resource is owned, team ownership.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;
use uuid::Uuid;

use tessera_registry::models::enums::ApiScope;
use tessera_registry::models::Team;
use tessera_registry::services::auth as auth_service;
use tessera_registry::store;
use tessera_registry::RegistryError;

use crate::error::ApiError;
use crate::state::AppState;

const SESSION_COOKIE: &str = "tessera_session";

/// The authenticated principal: a team and its granted scopes.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub team: Team,
    pub scopes: Vec<ApiScope>,
}

impl AuthContext {
    pub fn team_id(&self) -> Uuid {
        self.team.id
    }

    /// Admin implies every other scope.
    pub fn has_scope(&self, scope: ApiScope) -> bool {
        self.scopes.contains(&ApiScope::Admin) || self.scopes.contains(&scope)
    }

    pub fn require_scope(&self, scope: ApiScope) -> Result<(), ApiError> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(RegistryError::InsufficientScope(scope).into())
        }
    }

    /// Resource-ownership check: the caller must act as `team_id` or hold
    /// admin scope.
    pub fn require_team(&self, team_id: Uuid, message: &str) -> Result<(), ApiError> {
        if self.team_id() == team_id || self.has_scope(ApiScope::Admin) {
            Ok(())
        } else {
            Err(RegistryError::UnauthorizedTeam(message.to_string()).into())
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let settings = &state.settings;

        if settings.auth_disabled {
            let mut conn = state.db.acquire().await.map_err(RegistryError::Database)?;
            let team = store::teams::first(&mut conn)
                .await?
                .ok_or_else(|| RegistryError::Internal("auth disabled but no team exists".into()))?;
            return Ok(AuthContext {
                team,
                scopes: ApiScope::all(),
            });
        }

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let Some(authorization) = authorization else {
            if let Some(context) = session_auth(parts, state).await? {
                return Ok(context);
            }
            return Err(RegistryError::MissingApiKey.into());
        };

        let Some(key) = authorization.strip_prefix("Bearer ") else {
            return Err(RegistryError::InvalidAuthHeader.into());
        };

        // Bootstrap key: admin scopes bound to the first team.
        if let Some(bootstrap) = settings.bootstrap_api_key.as_deref() {
            if key == bootstrap {
                let mut conn = state.db.acquire().await.map_err(RegistryError::Database)?;
                let team = store::teams::first(&mut conn).await?.ok_or_else(|| {
                    RegistryError::Internal(
                        "no teams exist; create the first team with the bootstrap key".into(),
                    )
                })?;
                return Ok(AuthContext {
                    team,
                    scopes: ApiScope::all(),
                });
            }
        }

        let mut conn = state.db.acquire().await.map_err(RegistryError::Database)?;
        let validated = auth_service::validate_api_key(&mut conn, key, Utc::now()).await?;
        let Some((api_key, team)) = validated else {
            return Err(RegistryError::InvalidApiKey.into());
        };

        Ok(AuthContext {
            team,
            scopes: api_key.scopes,
        })
    }
}

/// Authorization check for team creation, which must also work before any
/// team exists: the bootstrap key, an admin-scoped API key, or auth
/// disabled. Returns the acting team id when a regular key was used.
pub async fn verify_can_create_team(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Uuid>, ApiError> {
    let settings = &state.settings;
    if settings.auth_disabled {
        return Ok(None);
    }

    let Some(authorization) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Err(RegistryError::MissingApiKey.into());
    };
    let Some(key) = authorization.strip_prefix("Bearer ") else {
        return Err(RegistryError::InvalidAuthHeader.into());
    };

    if let Some(bootstrap) = settings.bootstrap_api_key.as_deref() {
        if key == bootstrap {
            return Ok(None);
        }
    }

    let mut conn = state.db.acquire().await.map_err(RegistryError::Database)?;
    let validated = auth_service::validate_api_key(&mut conn, key, Utc::now()).await?;
    let Some((api_key, team)) = validated else {
        return Err(RegistryError::InvalidApiKey.into());
    };
    if !api_key.scopes.contains(&ApiScope::Admin) {
        return Err(RegistryError::InsufficientScope(ApiScope::Admin).into());
    }
    Ok(Some(team.id))
}

/// Session fallback for web-UI callers: a signed cookie naming a live user
/// whose role maps onto scopes.
async fn session_auth(
    parts: &Parts,
    state: &Arc<AppState>,
) -> Result<Option<AuthContext>, ApiError> {
    let Some(token) = session_cookie(parts) else {
        return Ok(None);
    };
    let Some(user_id) = auth_service::verify_session(&token, &state.settings.session_secret) else {
        return Ok(None);
    };

    let mut conn = state.db.acquire().await.map_err(RegistryError::Database)?;
    let Some(user) = store::users::get_live(&mut conn, user_id).await? else {
        return Ok(None);
    };
    let Some(team_id) = user.team_id else {
        return Ok(None);
    };
    let Ok(team) = store::teams::get(&mut conn, team_id).await else {
        return Ok(None);
    };

    Ok(Some(AuthContext {
        team,
        scopes: user.role.scopes(),
    }))
}

fn session_cookie(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn context(scopes: Vec<ApiScope>) -> AuthContext {
        AuthContext {
            team: Team {
                id: Uuid::new_v4(),
                name: "data-platform".to_string(),
                metadata: json!({}),
                created_at: Utc::now(),
                deleted_at: None,
            },
            scopes,
        }
    }

    #[test]
    fn test_admin_implies_all_scopes() {
        let ctx = context(vec![ApiScope::Admin]);
        assert!(ctx.has_scope(ApiScope::Read));
        assert!(ctx.has_scope(ApiScope::Write));
        assert!(ctx.has_scope(ApiScope::Admin));
    }

    #[test]
    fn test_scope_check_rejects_missing_scope() {
        let ctx = context(vec![ApiScope::Read]);
        assert!(ctx.require_scope(ApiScope::Read).is_ok());
        assert!(ctx.require_scope(ApiScope::Write).is_err());
        assert!(ctx.require_scope(ApiScope::Admin).is_err());
    }

    #[test]
    fn test_team_ownership_check() {
        let ctx = context(vec![ApiScope::Write]);
        assert!(ctx.require_team(ctx.team_id(), "own team").is_ok());
        assert!(ctx.require_team(Uuid::new_v4(), "other team").is_err());

        let admin = context(vec![ApiScope::Admin]);
        assert!(admin.require_team(Uuid::new_v4(), "any team").is_ok());
    }
}

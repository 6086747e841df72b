use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::ApiScope;

/// A stored API key. The raw key is never persisted; only its salted hash
/// and a short prefix used to narrow verification candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub key_prefix: String,
    pub name: String,
    pub team_id: Uuid,
    pub scopes: Vec<ApiScope>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.revoked_at.is_some() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Response shape for a freshly created key: the only time the raw key is
/// ever returned.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyCreated {
    pub id: Uuid,
    pub key: String,
    pub key_prefix: String,
    pub name: String,
    pub team_id: Uuid,
    pub scopes: Vec<ApiScope>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(expires_at: Option<DateTime<Utc>>, revoked_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            key_hash: "hash".to_string(),
            key_prefix: "tess_live_abcd1234".to_string(),
            name: "ci".to_string(),
            team_id: Uuid::new_v4(),
            scopes: vec![ApiScope::Read],
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
            revoked_at,
        }
    }

    #[test]
    fn test_key_active_states() {
        let now = Utc::now();
        assert!(key(None, None).is_active(now));
        assert!(key(Some(now + Duration::hours(1)), None).is_active(now));
        assert!(!key(Some(now - Duration::hours(1)), None).is_active(now));
        assert!(!key(None, Some(now)).is_active(now));
    }
}

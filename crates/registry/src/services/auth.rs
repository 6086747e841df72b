//! API key lifecycle and verification, plus session-cookie signing.
//!
//! Keys look like `tess_{env}_{64 hex chars}`. Only a salted argon2 hash is
//! stored; a short prefix (`tess_{env}_{first 8 chars}`) narrows the
//! candidate set at verification time since salted hashes cannot be looked
//! up directly.

use argon2::password_hash::rand_core::OsRng as HashOsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use sqlx::PgConnection;
use tracing::warn;
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::models::enums::ApiScope;
use crate::models::{ApiKey, ApiKeyCreated, Team};
use crate::store;

type HmacSha256 = Hmac<Sha256>;

/// Generate a new API key.
///
/// Returns `(full_key, key_hash, key_prefix)`. The full key is shown to the
/// caller exactly once.
pub fn generate_api_key(environment: &str) -> Result<(String, String, String)> {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let random_part = hex::encode(raw);

    let full_key = format!("tess_{environment}_{random_part}");
    let key_hash = hash_api_key(&full_key)?;
    let key_prefix = format!("tess_{environment}_{}", &random_part[..8]);
    Ok((full_key, key_hash, key_prefix))
}

/// Salted argon2 hash for storage.
pub fn hash_api_key(key: &str) -> Result<String> {
    let salt = SaltString::generate(&mut HashOsRng);
    Argon2::default()
        .hash_password(key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RegistryError::Internal(format!("key hashing failed: {e}")))
}

/// Verify a raw key against a stored hash.
pub fn verify_api_key(key: &str, key_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(key_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(key.as_bytes(), &parsed)
        .is_ok()
}

/// Extract the stored prefix from a presented key, or `None` when the key is
/// malformed.
pub fn parse_key_prefix(key: &str) -> Option<String> {
    let mut parts = key.splitn(3, '_');
    let vendor = parts.next()?;
    let environment = parts.next()?;
    let random_part = parts.next()?;
    if vendor != "tess" || environment.is_empty() || random_part.len() < 8 {
        return None;
    }
    Some(format!("{vendor}_{environment}_{}", &random_part[..8]))
}

/// Validate a presented key: narrow candidates by prefix, verify the salted
/// hash of each, stamp `last_used_at` on the winner.
pub async fn validate_api_key(
    conn: &mut PgConnection,
    key: &str,
    now: DateTime<Utc>,
) -> Result<Option<(ApiKey, Team)>> {
    let Some(prefix) = parse_key_prefix(key) else {
        return Ok(None);
    };

    let candidates = store::api_keys::candidates_by_prefix(conn, &prefix, now).await?;
    for (api_key, team) in candidates {
        if verify_api_key(key, &api_key.key_hash) {
            if let Err(e) = store::api_keys::touch_last_used(conn, api_key.id, now).await {
                warn!("Failed to stamp last_used_at for key {}: {}", api_key.id, e);
            }
            return Ok(Some((api_key, team)));
        }
    }
    Ok(None)
}

/// Create and persist a new key for a team. The raw key appears only in the
/// returned value.
pub async fn create_api_key(
    conn: &mut PgConnection,
    name: &str,
    team_id: Uuid,
    scopes: &[ApiScope],
    expires_at: Option<DateTime<Utc>>,
    environment: &str,
) -> Result<ApiKeyCreated> {
    store::teams::get(conn, team_id).await?;

    let (full_key, key_hash, key_prefix) = generate_api_key(environment)?;
    let stored = store::api_keys::insert(
        conn,
        store::api_keys::NewApiKey {
            key_hash: &key_hash,
            key_prefix: &key_prefix,
            name,
            team_id,
            scopes,
            expires_at,
        },
    )
    .await?;

    Ok(ApiKeyCreated {
        id: stored.id,
        key: full_key,
        key_prefix: stored.key_prefix,
        name: stored.name,
        team_id: stored.team_id,
        scopes: stored.scopes,
        created_at: stored.created_at,
        expires_at: stored.expires_at,
    })
}

/// Sign a session payload: `{user_id}.{hmac_sha256_hex}`.
pub fn sign_session(user_id: Uuid, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| RegistryError::Internal(format!("session key rejected: {e}")))?;
    mac.update(user_id.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("{user_id}.{signature}"))
}

/// Verify a signed session token and return the embedded user id. The
/// comparison runs in constant time.
pub fn verify_session(token: &str, secret: &str) -> Option<Uuid> {
    let (user_part, signature_hex) = token.split_once('.')?;
    let user_id = Uuid::parse_str(user_part).ok()?;
    let signature = hex::decode(signature_hex).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(user_id.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let (full, hash, prefix) = generate_api_key("live").unwrap();
        assert!(full.starts_with("tess_live_"));
        assert_eq!(full.len(), "tess_live_".len() + 64);
        assert!(hash.starts_with("$argon2"));
        assert_eq!(prefix.len(), "tess_live_".len() + 8);
        assert!(full.starts_with(&prefix));
    }

    #[test]
    fn test_verify_round_trip() {
        let (full, hash, _) = generate_api_key("test").unwrap();
        assert!(verify_api_key(&full, &hash));
        assert!(!verify_api_key("tess_test_wrong", &hash));
    }

    #[test]
    fn test_prefix_parsing() {
        let key = format!("tess_live_{}", "a".repeat(64));
        assert_eq!(
            parse_key_prefix(&key).as_deref(),
            Some("tess_live_aaaaaaaa")
        );
        assert!(parse_key_prefix("garbage").is_none());
        assert!(parse_key_prefix("tess_live").is_none());
        assert!(parse_key_prefix("tess_live_short").is_none());
        assert!(parse_key_prefix("other_live_aaaaaaaaaa").is_none());
    }

    #[test]
    fn test_session_round_trip() {
        let user_id = Uuid::new_v4();
        let token = sign_session(user_id, "secret").unwrap();
        assert_eq!(verify_session(&token, "secret"), Some(user_id));
    }

    #[test]
    fn test_session_tampering_rejected() {
        let user_id = Uuid::new_v4();
        let token = sign_session(user_id, "secret").unwrap();

        assert_eq!(verify_session(&token, "other-secret"), None);

        let other_user = Uuid::new_v4();
        let forged = format!(
            "{}.{}",
            other_user,
            token.split_once('.').unwrap().1
        );
        assert_eq!(verify_session(&forged, "secret"), None);
        assert_eq!(verify_session("not-a-token", "secret"), None);
    }
}

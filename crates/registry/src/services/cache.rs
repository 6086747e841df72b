//! Read-through cache over an optional Redis backend.
//!
//! The cache is never required for correctness: when the backend is absent
//! or unreachable, `get` degrades to a miss and `set`/`delete` report
//! `false` without surfacing an error.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cache namespaces with their TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Contract,
    Asset,
    Lineage,
    SchemaDiff,
    Search,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Asset => "asset",
            Self::Lineage => "lineage",
            Self::SchemaDiff => "schema-diff",
            Self::Search => "search",
        }
    }

    pub fn ttl_secs(&self) -> usize {
        match self {
            Self::Contract => 600,
            Self::Asset => 300,
            Self::Lineage => 300,
            Self::SchemaDiff => 3600,
            Self::Search => 60,
        }
    }
}

/// Shared cache client. Cloning is cheap; all clones share one connection.
#[derive(Clone)]
pub struct Cache {
    conn: Option<ConnectionManager>,
}

impl Cache {
    /// Connect to Redis when a URL is configured. Connection failures are
    /// logged and leave the cache disabled.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let Some(url) = redis_url else {
            info!("No cache backend configured; running without cache");
            return Self::disabled();
        };

        let client = match redis::Client::open(url) {
            Ok(client) => client,
            Err(e) => {
                warn!("Invalid cache URL, running without cache: {}", e);
                return Self::disabled();
            }
        };
        match client.get_connection_manager().await {
            Ok(conn) => {
                info!("Cache backend connected");
                Self { conn: Some(conn) }
            }
            Err(e) => {
                warn!("Cache backend unreachable, running without cache: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { conn: None }
    }

    fn full_key(ns: Namespace, key: &str) -> String {
        format!("tessera:{}:{}", ns.prefix(), key)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, ns: Namespace, key: &str) -> Option<T> {
        let mut conn = self.conn.clone()?;
        let full_key = Self::full_key(ns, key);
        match conn.get::<_, Option<String>>(&full_key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                debug!("Cache get failed for {}: {}", full_key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, ns: Namespace, key: &str, value: &T) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        let Ok(raw) = serde_json::to_string(value) else {
            return false;
        };
        let full_key = Self::full_key(ns, key);
        match conn
            .set_ex::<_, _, ()>(&full_key, raw, ns.ttl_secs() as u64)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Cache set failed for {}: {}", full_key, e);
                false
            }
        }
    }

    pub async fn delete(&self, ns: Namespace, key: &str) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        let full_key = Self::full_key(ns, key);
        match conn.del::<_, i64>(&full_key).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Cache delete failed for {}: {}", full_key, e);
                false
            }
        }
    }

    /// Invalidate everything a publication touches: the asset, its lineage,
    /// and the deprecated predecessor contract.
    pub async fn invalidate_publication(&self, asset_id: Uuid, predecessor_id: Option<Uuid>) {
        self.delete(Namespace::Asset, &asset_id.to_string()).await;
        self.delete(Namespace::Lineage, &asset_id.to_string()).await;
        if let Some(contract_id) = predecessor_id {
            self.delete(Namespace::Contract, &contract_id.to_string())
                .await;
        }
    }

    /// Invalidate lineage after an asset or dependency mutation.
    pub async fn invalidate_lineage(&self, asset_id: Uuid) {
        self.delete(Namespace::Lineage, &asset_id.to_string()).await;
        self.delete(Namespace::Asset, &asset_id.to_string()).await;
    }
}

/// Stable cache key for a diff of `(old, new)`: SHA-256 over both serialized
/// documents.
pub fn schema_pair_key(old: &Value, new: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(old.to_string().as_bytes());
    hasher.update(b"\x00");
    hasher.update(new.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_cache_degrades_silently() {
        let cache = Cache::disabled();
        let miss: Option<Value> = cache.get_json(Namespace::Contract, "missing").await;
        assert!(miss.is_none());
        assert!(!cache.set_json(Namespace::Contract, "k", &json!({"a": 1})).await);
        assert!(!cache.delete(Namespace::Contract, "k").await);
    }

    #[test]
    fn test_schema_pair_key_is_stable_and_ordered() {
        let a = json!({"type": "object"});
        let b = json!({"type": "string"});
        assert_eq!(schema_pair_key(&a, &b), schema_pair_key(&a, &b));
        assert_ne!(schema_pair_key(&a, &b), schema_pair_key(&b, &a));
    }

    #[test]
    fn test_namespace_ttls() {
        assert_eq!(Namespace::Contract.ttl_secs(), 600);
        assert_eq!(Namespace::SchemaDiff.ttl_secs(), 3600);
        assert!(Namespace::Search.ttl_secs() < Namespace::Asset.ttl_secs());
    }
}

//! Shared application state.

use sqlx::PgPool;

use tessera_registry::services::Cache;
use tessera_registry::Settings;

/// Long-lived singletons shared across requests. Initialized once at boot.
pub struct AppState {
    pub db: PgPool,
    pub cache: Cache,
    pub settings: Settings,
    pub version: String,
}

impl AppState {
    pub fn new(db: PgPool, cache: Cache, settings: Settings) -> Self {
        Self {
            db,
            cache,
            settings,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

//! API server setup and configuration

use axum::Router;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use tessera_registry::services::{Cache, ExpirationSweeper, WebhookWorker};
use tessera_registry::{RegistryError, Settings};

use crate::error::Result;
use crate::middleware::{propagate_request_id, RateLimitConfig, RateLimitLayer};
use crate::routes;
use crate::state::AppState;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            enable_cors: true,
        }
    }
}

/// API Server
pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    /// Create a new API server: connects the cache, spawns the background
    /// workers, and builds the router.
    pub async fn new(config: ServerConfig, db: PgPool, settings: Settings) -> Self {
        let cache = Cache::connect(settings.redis_url.as_deref()).await;

        match WebhookWorker::new(db.clone(), &settings) {
            Ok(worker) => {
                tokio::spawn(worker.run());
            }
            Err(e) => error!("Webhook worker failed to start: {}", e),
        }
        tokio::spawn(ExpirationSweeper::new(db.clone(), &settings).run());

        let state = Arc::new(AppState::new(db, cache, settings));
        let app = Self::build_app(state, &config);

        Self { config, app }
    }

    /// Build the application router. Public so tests can drive the full
    /// middleware stack without binding a socket.
    pub fn build_app(state: Arc<AppState>, config: &ServerConfig) -> Router {
        let rate_limit = RateLimitLayer::new(RateLimitConfig::from_settings(&state.settings));

        let mut app = routes::create_router(state)
            .layer(rate_limit)
            .layer(TraceLayer::new_for_http());

        if config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        // Outermost, so error envelopes from every inner layer get the
        // canonical request id.
        app.layer(axum::middleware::from_fn(propagate_request_id))
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| RegistryError::Internal(format!("invalid socket address: {e}")))?;

        info!("Tessera API server starting on http://{}", addr);
        info!("Health check: http://{}/health", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| RegistryError::Internal(format!("failed to bind {addr}: {e}")))?;

        axum::serve(listener, self.app)
            .await
            .map_err(|e| RegistryError::Internal(format!("server error: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert!(config.enable_cors);
    }
}

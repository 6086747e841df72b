//! Tessera API Server Binary

use tessera_api::{telemetry, Server, ServerConfig};
use tessera_registry::{Database, Settings};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize structured logging (reads RUST_LOG and LOG_FORMAT env vars)
    telemetry::init();

    info!("Starting Tessera API server");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match Database::connect(&settings).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db.migrate().await {
        error!("Migrations failed: {}", e);
        std::process::exit(1);
    }

    let config = ServerConfig {
        host: std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: std::env::var("API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000),
        enable_cors: true,
    };

    let server = Server::new(config, db.pool().clone(), settings).await;

    if let Err(e) = server.start().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

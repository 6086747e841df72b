//! Tessera API Server
//!
//! HTTP/JSON surface for the contract registry: request routing, API-key and
//! session authentication, the uniform error envelope, and rate limiting.

pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use auth::AuthContext;
pub use error::{ApiError, Result};
pub use server::{Server, ServerConfig};
pub use state::AppState;

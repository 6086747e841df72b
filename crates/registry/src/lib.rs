//! Tessera Registry
//!
//! Persistence, configuration, and the stateful services behind the contract
//! lifecycle: publication, proposals, impact traversal, audit trail,
//! authentication, caching, and webhook delivery.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use config::Settings;
pub use db::Database;
pub use error::{RegistryError, Result};

//! Persistence adapter.
//!
//! Every function takes `&mut PgConnection`, so a request handler can run
//! all of its reads and writes inside one transaction and commit or roll
//! back as a unit. Unique-constraint violations surface as typed domain
//! errors.

pub mod api_keys;
pub mod assets;
pub mod audit;
pub mod contracts;
pub mod dependencies;
pub mod proposals;
pub mod registrations;
pub mod search;
pub mod teams;
pub mod users;
pub mod webhooks;

use serde::de::DeserializeOwned;

use crate::error::{RegistryError, Result};

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

/// Decode a TEXT enum column through its serde wire name.
pub(crate) fn parse_enum<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|_| {
        RegistryError::Internal(format!("unexpected enum value '{raw}' in database"))
    })
}

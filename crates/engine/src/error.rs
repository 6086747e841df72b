//! Error types for the evolution engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid semantic version '{0}'")]
    InvalidVersion(String),

    #[error("Version '{candidate}' must be greater than '{predecessor}'")]
    VersionNotGreater {
        candidate: String,
        predecessor: String,
    },

    #[error("Invalid schema: {}", .0.join("; "))]
    InvalidSchema(Vec<String>),
}

pub type Result<T> = std::result::Result<T, EngineError>;

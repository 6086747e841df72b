//! Tessera Contract Evolution Engine
//!
//! Pure schema-evolution logic: structural diffing of schema documents,
//! compatibility classification, and semantic-version handling. No I/O.

pub mod compat;
pub mod diff;
pub mod error;
pub mod schema;
pub mod version;

pub use compat::{breaking_changes, is_compatible, CompatibilityMode};
pub use diff::{diff_schemas, ChangeKind, ChangeRecord, ChangeType, SchemaDiff};
pub use error::{EngineError, Result};
pub use schema::{validate_schema, SchemaLimits};

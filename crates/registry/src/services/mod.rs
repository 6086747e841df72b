//! Domain services: the contract lifecycle engine and its supporting
//! infrastructure.

pub mod audit;
pub mod auth;
pub mod cache;
pub mod expiration;
pub mod impact;
pub mod publication;
pub mod webhook;

pub use audit::{log_event, AuditAction};
pub use cache::{Cache, Namespace};
pub use expiration::ExpirationSweeper;
pub use impact::{analyze_impact, ImpactAnalysis};
pub use publication::{publish, PublishOutcome, PublishRequest};
pub use webhook::WebhookWorker;

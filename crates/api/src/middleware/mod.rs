//! HTTP middleware

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{RateLimitConfig, RateLimitLayer};
pub use request_id::propagate_request_id;

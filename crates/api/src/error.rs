//! Error types and the uniform error envelope.
//!
//! Domain errors carry machine-readable codes; this module maps them onto
//! HTTP statuses and renders the standard body:
//!
//! ```json
//! {"error": {"code": "...", "message": "...", "request_id": "...",
//!            "timestamp": "...", "details": {...}}}
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use tessera_registry::RegistryError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Request validation failed")]
    BodyValidation(#[from] JsonRejection),
}

impl From<tessera_engine::EngineError> for ApiError {
    fn from(err: tessera_engine::EngineError) -> Self {
        Self::Registry(RegistryError::Engine(err))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Registry(RegistryError::Database(err))
    }
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Registry(err) => err.code(),
            Self::BodyValidation(_) => "VALIDATION_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BodyValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Registry(err) => match err {
                RegistryError::Validation(_)
                | RegistryError::InvalidFqn(_)
                | RegistryError::Engine(_) => StatusCode::BAD_REQUEST,
                RegistryError::MissingApiKey
                | RegistryError::InvalidAuthHeader
                | RegistryError::InvalidApiKey => StatusCode::UNAUTHORIZED,
                RegistryError::InsufficientScope(_) | RegistryError::UnauthorizedTeam(_) => {
                    StatusCode::FORBIDDEN
                }
                RegistryError::TeamNotFound(_)
                | RegistryError::UserNotFound(_)
                | RegistryError::AssetNotFound(_)
                | RegistryError::ContractNotFound(_)
                | RegistryError::ProposalNotFound(_)
                | RegistryError::RegistrationNotFound(_)
                | RegistryError::DependencyNotFound(_)
                | RegistryError::ApiKeyNotFound(_)
                | RegistryError::DeliveryNotFound(_)
                | RegistryError::AuditEventNotFound(_) => StatusCode::NOT_FOUND,
                RegistryError::DuplicateTeam(_)
                | RegistryError::DuplicateAsset(_)
                | RegistryError::DuplicateContractVersion(_)
                | RegistryError::DuplicateRegistration
                | RegistryError::DuplicateAcknowledgment
                | RegistryError::DuplicateDependency
                | RegistryError::PublishConflict
                | RegistryError::SelfDependency
                | RegistryError::ProposalNotPending(_) => StatusCode::CONFLICT,
                RegistryError::Database(_)
                | RegistryError::Config(_)
                | RegistryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Registry(RegistryError::Validation(problems)) => {
                Some(json!({"errors": problems}))
            }
            Self::Registry(RegistryError::Engine(tessera_engine::EngineError::InvalidSchema(
                problems,
            ))) => Some(json!({"errors": problems})),
            Self::Registry(RegistryError::InsufficientScope(scope)) => {
                Some(json!({"required_scope": scope.as_str()}))
            }
            Self::Registry(err) if err.is_retryable() => Some(json!({"retryable": true})),
            Self::BodyValidation(rejection) => Some(json!({"errors": [rejection.to_string()]})),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            // Never leak internals to the caller.
            Self::Registry(RegistryError::Database(_))
            | Self::Registry(RegistryError::Config(_))
            | Self::Registry(RegistryError::Internal(_)) => {
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// The fields of an error body, minus the request id which the request-id
/// middleware fills in.
#[derive(Debug, Clone)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn to_json(&self, request_id: &str) -> Value {
        let mut error = json!({
            "code": self.code,
            "message": self.message,
            "request_id": request_id,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(details) = &self.details {
            error["details"] = details.clone();
        }
        json!({"error": error})
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.message(),
            details: self.details(),
        };
        // The body rendered here carries a fresh id as a fallback; the
        // request-id middleware re-renders it with the canonical id.
        let fallback_id = Uuid::new_v4().to_string();
        let mut response =
            (self.status_code(), Json(body.to_json(&fallback_id))).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::from(RegistryError::AssetNotFound(Uuid::new_v4()));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.code(), "ASSET_NOT_FOUND");

        let conflict = ApiError::from(RegistryError::DuplicateTeam("data".to_string()));
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let auth = ApiError::from(RegistryError::MissingApiKey);
        assert_eq!(auth.status_code(), StatusCode::UNAUTHORIZED);

        let forbidden = ApiError::from(RegistryError::UnauthorizedTeam("nope".to_string()));
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.code(), "UNAUTHORIZED_TEAM");
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = ApiError::from(RegistryError::Internal("connection string".to_string()));
        assert_eq!(err.message(), "An unexpected error occurred");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_envelope_shape() {
        let body = ErrorBody {
            code: "ASSET_NOT_FOUND",
            message: "Asset not found".to_string(),
            details: None,
        };
        let rendered = body.to_json("req-1");
        assert_eq!(rendered["error"]["code"], "ASSET_NOT_FOUND");
        assert_eq!(rendered["error"]["request_id"], "req-1");
        assert!(rendered["error"]["timestamp"].is_string());
        assert!(rendered["error"].get("details").is_none());
    }
}

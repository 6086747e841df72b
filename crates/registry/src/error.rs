//! Error types for the registry

use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::ApiScope;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Team '{0}' not found")]
    TeamNotFound(Uuid),

    #[error("User '{0}' not found")]
    UserNotFound(Uuid),

    #[error("Asset '{0}' not found")]
    AssetNotFound(Uuid),

    #[error("Contract '{0}' not found")]
    ContractNotFound(Uuid),

    #[error("Proposal '{0}' not found")]
    ProposalNotFound(Uuid),

    #[error("Registration '{0}' not found")]
    RegistrationNotFound(Uuid),

    #[error("Dependency '{0}' not found")]
    DependencyNotFound(Uuid),

    #[error("API key '{0}' not found")]
    ApiKeyNotFound(Uuid),

    #[error("Webhook delivery '{0}' not found")]
    DeliveryNotFound(Uuid),

    #[error("Audit event '{0}' not found")]
    AuditEventNotFound(Uuid),

    #[error("Team with name '{0}' already exists")]
    DuplicateTeam(String),

    #[error("Asset with FQN '{0}' already exists")]
    DuplicateAsset(String),

    #[error("Contract version '{0}' already exists for this asset")]
    DuplicateContractVersion(String),

    #[error("This team is already registered on this contract")]
    DuplicateRegistration,

    #[error("This team has already acknowledged this proposal")]
    DuplicateAcknowledgment,

    #[error("Dependency already exists")]
    DuplicateDependency,

    #[error("Another publish for this asset is in flight; retry")]
    PublishConflict,

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid FQN '{0}'")]
    InvalidFqn(String),

    #[error(transparent)]
    Engine(#[from] tessera_engine::EngineError),

    #[error("Asset cannot depend on itself")]
    SelfDependency,

    #[error("Proposal is {0}, not pending")]
    ProposalNotPending(String),

    #[error("Missing Authorization header. Use 'Authorization: Bearer <api_key>'")]
    MissingApiKey,

    #[error("Invalid Authorization header. Use 'Authorization: Bearer <api_key>'")]
    InvalidAuthHeader,

    #[error("Invalid or expired API key")]
    InvalidApiKey,

    #[error("This operation requires the '{0}' scope")]
    InsufficientScope(ApiScope),

    #[error("{0}")]
    UnauthorizedTeam(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Machine-readable error code exposed in the API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TeamNotFound(_) => "TEAM_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::AssetNotFound(_) => "ASSET_NOT_FOUND",
            Self::ContractNotFound(_) => "CONTRACT_NOT_FOUND",
            Self::ProposalNotFound(_) => "PROPOSAL_NOT_FOUND",
            Self::RegistrationNotFound(_) => "REGISTRATION_NOT_FOUND",
            Self::DependencyNotFound(_) => "DEPENDENCY_NOT_FOUND",
            Self::ApiKeyNotFound(_) => "API_KEY_NOT_FOUND",
            Self::DeliveryNotFound(_) | Self::AuditEventNotFound(_) => "NOT_FOUND",
            Self::DuplicateTeam(_) => "DUPLICATE_TEAM",
            Self::DuplicateAsset(_) => "DUPLICATE_ASSET",
            Self::DuplicateContractVersion(_) => "DUPLICATE_CONTRACT_VERSION",
            Self::DuplicateRegistration => "DUPLICATE_REGISTRATION",
            Self::DuplicateAcknowledgment => "DUPLICATE_ACKNOWLEDGMENT",
            Self::DuplicateDependency => "DUPLICATE_DEPENDENCY",
            Self::PublishConflict => "PUBLISH_CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidFqn(_) => "INVALID_FQN",
            Self::Engine(tessera_engine::EngineError::InvalidSchema(_)) => "INVALID_SCHEMA",
            Self::Engine(_) => "INVALID_VERSION",
            Self::SelfDependency => "SELF_DEPENDENCY",
            Self::ProposalNotPending(_) => "PROPOSAL_NOT_PENDING",
            Self::MissingApiKey => "MISSING_API_KEY",
            Self::InvalidAuthHeader => "INVALID_AUTH_HEADER",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::InsufficientScope(_) => "INSUFFICIENT_SCOPE",
            Self::UnauthorizedTeam(_) => "UNAUTHORIZED_TEAM",
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a caller can expect a retry to succeed without changing the
    /// request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PublishConflict)
    }
}

/// Translate a database unique/constraint violation into the matching domain
/// error. Other database errors pass through unchanged.
pub fn map_constraint_violation(err: sqlx::Error, context: ConstraintContext<'_>) -> RegistryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if let Some(constraint) = db_err.constraint() {
            return match constraint {
                "teams_name_key" => RegistryError::DuplicateTeam(context.label.to_string()),
                "assets_fqn_key" => RegistryError::DuplicateAsset(context.label.to_string()),
                "contracts_asset_version_key" => {
                    RegistryError::DuplicateContractVersion(context.label.to_string())
                }
                "contracts_one_active_per_asset" => RegistryError::PublishConflict,
                "registrations_contract_consumer_key" => RegistryError::DuplicateRegistration,
                "acknowledgments_proposal_consumer_key" => RegistryError::DuplicateAcknowledgment,
                "dependencies_edge_key" => RegistryError::DuplicateDependency,
                _ => RegistryError::Database(err),
            };
        }
    }
    RegistryError::Database(err)
}

/// Label threaded into duplicate errors so messages can name the value that
/// collided.
pub struct ConstraintContext<'a> {
    pub label: &'a str,
}

impl<'a> ConstraintContext<'a> {
    pub fn new(label: &'a str) -> Self {
        Self { label }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

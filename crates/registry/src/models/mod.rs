//! Domain entities and enumerations.

pub mod api_key;
pub mod asset;
pub mod audit;
pub mod contract;
pub mod enums;
pub mod proposal;
pub mod team;
pub mod webhook;

pub use api_key::{ApiKey, ApiKeyCreated};
pub use asset::{validate_fqn, Asset, AssetDependency};
pub use audit::AuditEvent;
pub use contract::{Contract, Guarantees, Registration};
pub use enums::{
    ApiScope, ContractStatus, DeliveryStatus, DependencyType, GuaranteeMode, ProposalStatus,
    RegistrationStatus, ResourceType, UserRole,
};
pub use proposal::{AckResponse, Acknowledgment, Proposal};
pub use team::{Team, User};
pub use webhook::WebhookDelivery;

// The evolution engine owns the schema-change vocabulary.
pub use tessera_engine::{ChangeKind, ChangeRecord, ChangeType, CompatibilityMode};

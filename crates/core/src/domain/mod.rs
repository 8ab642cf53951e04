// Domain Layer - Queue identity/state and configuration model

pub mod cluster;
pub mod error;
pub mod identity;
pub mod request;
pub mod state;

// Re-exports
pub use cluster::{ClusterConfig, DestinationConfig, DestinationKey};
pub use error::{DelegationError, DomainError};
pub use identity::QueueIdentity;
pub use request::{DelegationOutcome, ForwarderError, ForwarderErrorFeature, RequestContext};
pub use state::{QueueState, QueueStatus};

// Domain Error Types

use crate::port::{CreateRuleError, DelegateError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Cluster id must not be empty")]
    EmptyClusterId,

    #[error("Destination id must not be empty (cluster {cluster_id})")]
    EmptyDestinationId { cluster_id: String },

    #[error("Duplicate destination {destination_id} in cluster {cluster_id}")]
    DuplicateDestination {
        cluster_id: String,
        destination_id: String,
    },

    #[error("Destination {destination_id} has an empty delegation {field}")]
    EmptyDelegationField {
        destination_id: String,
        field: &'static str,
    },
}

/// Reason a request could not be handed off.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelegationError {
    #[error("Request delegation is not available on this host")]
    CapabilityUnavailable,

    #[error("Destination {0} is not bound to a delegation queue")]
    NotBound(String),

    #[error("Delegation queue is not initialized: {0}")]
    QueueNotInitialized(#[source] CreateRuleError),

    #[error("Failed to delegate request: {0}")]
    Delegate(#[from] DelegateError),
}

pub type Result<T> = std::result::Result<T, DomainError>;

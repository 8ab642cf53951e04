// Cluster / Destination Configuration Model

use super::error::{DomainError, Result};
use super::identity::QueueIdentity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Destination attributes read by the delegation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub destination_id: String,
    #[serde(default)]
    pub delegation_queue_name: Option<String>,
    #[serde(default)]
    pub delegation_url_prefix: Option<String>,
}

impl DestinationConfig {
    pub fn new(destination_id: impl Into<String>) -> Self {
        Self {
            destination_id: destination_id.into(),
            delegation_queue_name: None,
            delegation_url_prefix: None,
        }
    }

    pub fn with_delegation(
        mut self,
        queue_name: impl Into<String>,
        url_prefix: impl Into<String>,
    ) -> Self {
        self.delegation_queue_name = Some(queue_name.into());
        self.delegation_url_prefix = Some(url_prefix.into());
        self
    }

    /// Queue this destination delegates to, or `None` when either the queue
    /// name or the URL prefix is missing.
    pub fn delegation_identity(&self) -> Option<QueueIdentity> {
        match (&self.delegation_queue_name, &self.delegation_url_prefix) {
            (Some(name), Some(prefix)) => Some(QueueIdentity::new(name.as_str(), prefix.as_str())),
            _ => None,
        }
    }
}

/// A named group of destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cluster_id: String,
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

impl ClusterConfig {
    pub fn new(cluster_id: impl Into<String>, destinations: Vec<DestinationConfig>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            destinations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_id.trim().is_empty() {
            return Err(DomainError::EmptyClusterId);
        }

        let mut seen = HashSet::new();
        for destination in &self.destinations {
            if destination.destination_id.trim().is_empty() {
                return Err(DomainError::EmptyDestinationId {
                    cluster_id: self.cluster_id.clone(),
                });
            }
            if !seen.insert(destination.destination_id.as_str()) {
                return Err(DomainError::DuplicateDestination {
                    cluster_id: self.cluster_id.clone(),
                    destination_id: destination.destination_id.clone(),
                });
            }
            check_not_blank(destination, destination.delegation_queue_name.as_deref(), "queue name")?;
            check_not_blank(destination, destination.delegation_url_prefix.as_deref(), "URL prefix")?;
        }

        Ok(())
    }

    pub fn key_for(&self, destination: &DestinationConfig) -> DestinationKey {
        DestinationKey::new(self.cluster_id.as_str(), destination.destination_id.as_str())
    }
}

fn check_not_blank(
    destination: &DestinationConfig,
    value: Option<&str>,
    field: &'static str,
) -> Result<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(DomainError::EmptyDelegationField {
            destination_id: destination.destination_id.clone(),
            field,
        }),
        _ => Ok(()),
    }
}

/// Identifies a destination across clusters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationKey {
    pub cluster_id: String,
    pub destination_id: String,
}

impl DestinationKey {
    pub fn new(cluster_id: impl Into<String>, destination_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            destination_id: destination_id.into(),
        }
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster_id, self.destination_id)
    }
}

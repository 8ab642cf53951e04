//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use sluice_core::application::QueueSnapshot;
use sluice_core::domain::ClusterConfig;

/// admin.queue.reset.v1 - Force a queue back to empty
#[derive(Debug, Deserialize)]
pub struct ResetQueueRequest {
    pub queue_name: String,
    pub url_prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetQueueResponse {
    pub reset: bool,
    pub previous_state: Option<String>,
}

/// admin.queue.list.v1 - List live queues
#[derive(Debug, Deserialize)]
pub struct ListQueuesRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize)]
pub struct ListQueuesResponse {
    pub queues: Vec<QueueSnapshot>,
}

/// admin.stats.v1 - Delegation statistics
#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub capability_available: bool,
    pub live_queues: usize,
    pub bindings: usize,
    pub uptime_secs: u64,
}

/// config.cluster.apply.v1 - Cluster added or changed
#[derive(Debug, Deserialize)]
pub struct ApplyClusterRequest {
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyClusterResponse {
    pub cluster_id: String,
    pub bound_destinations: usize,
}

/// config.cluster.remove.v1 - Cluster removed
#[derive(Debug, Deserialize)]
pub struct RemoveClusterRequest {
    pub cluster_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveClusterResponse {
    pub cluster_id: String,
    pub removed_bindings: usize,
}

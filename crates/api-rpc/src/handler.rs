//! RPC Method Handlers
//!
//! Translates JSON-RPC calls into `Delegator` operations.

use crate::error::to_rpc_error;
use crate::types::{
    ApplyClusterRequest, ApplyClusterResponse, ListQueuesRequest, ListQueuesResponse,
    RemoveClusterRequest, RemoveClusterResponse, ResetQueueRequest, ResetQueueResponse,
    StatsRequest, StatsResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use sluice_core::application::Delegator;
use sluice_core::error::AppError;
use std::sync::Arc;
use tracing::{debug, info};

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    delegator: Arc<Delegator>,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(delegator: Arc<Delegator>) -> Self {
        Self {
            delegator,
            start_time: std::time::Instant::now(),
        }
    }

    /// admin.queue.reset.v1
    pub async fn reset_queue(
        &self,
        params: ResetQueueRequest,
    ) -> Result<ResetQueueResponse, ErrorObjectOwned> {
        if params.queue_name.trim().is_empty() || params.url_prefix.trim().is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "queue_name and url_prefix are required".to_string(),
            )));
        }

        let previous = self
            .delegator
            .reset_queue(&params.queue_name, &params.url_prefix);

        debug!(
            queue_name = %params.queue_name,
            url_prefix = %params.url_prefix,
            reset = previous.is_some(),
            "Queue reset requested via RPC"
        );

        Ok(ResetQueueResponse {
            reset: previous.is_some(),
            previous_state: previous.map(|state| state.to_string()),
        })
    }

    /// admin.queue.list.v1
    pub async fn list_queues(
        &self,
        _params: ListQueuesRequest,
    ) -> Result<ListQueuesResponse, ErrorObjectOwned> {
        Ok(ListQueuesResponse {
            queues: self.delegator.queue_snapshots(),
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self, _params: StatsRequest) -> Result<StatsResponse, ErrorObjectOwned> {
        let stats = self.delegator.stats();

        Ok(StatsResponse {
            capability_available: stats.capability_available,
            live_queues: stats.live_queues,
            bindings: stats.bindings,
            uptime_secs: self.start_time.elapsed().as_secs(),
        })
    }

    /// config.cluster.apply.v1
    pub async fn apply_cluster(
        &self,
        params: ApplyClusterRequest,
    ) -> Result<ApplyClusterResponse, ErrorObjectOwned> {
        let cluster = params.cluster;
        cluster
            .validate()
            .map_err(|e| to_rpc_error(AppError::Domain(e)))?;

        let bound_destinations = self.delegator.on_cluster_changed(&cluster);

        info!(
            cluster_id = %cluster.cluster_id,
            destinations = cluster.destinations.len(),
            bound_destinations,
            "Cluster configuration applied"
        );

        Ok(ApplyClusterResponse {
            cluster_id: cluster.cluster_id,
            bound_destinations,
        })
    }

    /// config.cluster.remove.v1
    pub async fn remove_cluster(
        &self,
        params: RemoveClusterRequest,
    ) -> Result<RemoveClusterResponse, ErrorObjectOwned> {
        if params.cluster_id.trim().is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "cluster_id is required".to_string(),
            )));
        }

        let removed_bindings = self.delegator.on_cluster_removed(&params.cluster_id);

        info!(
            cluster_id = %params.cluster_id,
            removed_bindings,
            "Cluster removed"
        );

        Ok(RemoveClusterResponse {
            cluster_id: params.cluster_id,
            removed_bindings,
        })
    }
}

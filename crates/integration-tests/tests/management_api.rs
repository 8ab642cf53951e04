//! Management API Tests
//!
//! Drives the RPC handlers against a live delegator backed by the mock
//! capability.

use sluice_api_rpc::error::code;
use sluice_api_rpc::types::{
    ApplyClusterRequest, ListQueuesRequest, RemoveClusterRequest, ResetQueueRequest,
    StatsRequest,
};
use sluice_api_rpc::RpcHandler;
use sluice_core::application::Delegator;
use sluice_core::domain::{ClusterConfig, DestinationConfig};
use sluice_core::port::delegation::mocks::MockDelegationCapability;
use sluice_core::port::DelegationCapability;
use std::sync::Arc;

const PREFIX: &str = "http://+:80/orders/";

fn setup() -> (RpcHandler, Arc<MockDelegationCapability>) {
    let capability = Arc::new(MockDelegationCapability::new());
    let dyn_capability: Arc<dyn DelegationCapability> = capability.clone();
    let delegator = Arc::new(Delegator::new(Some(dyn_capability)));
    (RpcHandler::new(delegator), capability)
}

fn orders_cluster() -> ClusterConfig {
    ClusterConfig::new(
        "orders",
        vec![
            DestinationConfig::new("orders-1").with_delegation("orders", PREFIX),
            DestinationConfig::new("orders-2").with_delegation("orders", PREFIX),
            DestinationConfig::new("orders-3"),
        ],
    )
}

#[tokio::test]
async fn test_apply_cluster_then_list() {
    let (handler, capability) = setup();

    let applied = handler
        .apply_cluster(ApplyClusterRequest {
            cluster: orders_cluster(),
        })
        .await
        .unwrap();
    assert_eq!(applied.bound_destinations, 2);

    let listed = handler.list_queues(ListQueuesRequest {}).await.unwrap();
    assert_eq!(listed.queues.len(), 1);
    assert_eq!(listed.queues[0].state, "ready");
    assert_eq!(listed.queues[0].bound_destinations, 2);
    assert_eq!(capability.create_calls(), 1);
}

#[tokio::test]
async fn test_apply_cluster_rejects_invalid_config() {
    let (handler, _) = setup();
    let mut cluster = orders_cluster();
    cluster.destinations.push(DestinationConfig::new("orders-1"));

    let err = handler
        .apply_cluster(ApplyClusterRequest { cluster })
        .await
        .unwrap_err();

    assert_eq!(err.code(), code::VALIDATION_ERROR);
    let stats = handler.stats(StatsRequest {}).await.unwrap();
    assert_eq!(stats.bindings, 0);
}

#[tokio::test]
async fn test_reset_queue_over_rpc() {
    let (handler, capability) = setup();
    handler
        .apply_cluster(ApplyClusterRequest {
            cluster: orders_cluster(),
        })
        .await
        .unwrap();

    let reset = handler
        .reset_queue(ResetQueueRequest {
            queue_name: "Orders".to_string(),
            url_prefix: PREFIX.to_string(),
        })
        .await
        .unwrap();
    assert!(reset.reset);
    assert!(reset.previous_state.unwrap().starts_with("ready"));
    assert_eq!(capability.release_calls(), 1);

    let unknown = handler
        .reset_queue(ResetQueueRequest {
            queue_name: "billing".to_string(),
            url_prefix: PREFIX.to_string(),
        })
        .await
        .unwrap();
    assert!(!unknown.reset);
    assert!(unknown.previous_state.is_none());
}

#[tokio::test]
async fn test_reset_queue_requires_identity() {
    let (handler, _) = setup();

    let err = handler
        .reset_queue(ResetQueueRequest {
            queue_name: String::new(),
            url_prefix: PREFIX.to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), code::VALIDATION_ERROR);
}

#[tokio::test]
async fn test_remove_cluster_releases_queue() {
    let (handler, capability) = setup();
    handler
        .apply_cluster(ApplyClusterRequest {
            cluster: orders_cluster(),
        })
        .await
        .unwrap();

    let removed = handler
        .remove_cluster(RemoveClusterRequest {
            cluster_id: "orders".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(removed.removed_bindings, 2);
    assert_eq!(capability.release_calls(), 1);

    let stats = handler.stats(StatsRequest {}).await.unwrap();
    assert!(stats.capability_available);
    assert_eq!(stats.live_queues, 0);
    assert_eq!(stats.bindings, 0);
}

#[tokio::test]
async fn test_apply_request_deserializes_from_json() {
    let (handler, _) = setup();
    let request: ApplyClusterRequest = serde_json::from_value(serde_json::json!({
        "cluster": {
            "cluster_id": "billing",
            "destinations": [{
                "destination_id": "billing-1",
                "delegation_queue_name": "billing",
                "delegation_url_prefix": "http://+:80/billing/"
            }]
        }
    }))
    .unwrap();

    let applied = handler.apply_cluster(request).await.unwrap();
    assert_eq!(applied.cluster_id, "billing");
    assert_eq!(applied.bound_destinations, 1);
}

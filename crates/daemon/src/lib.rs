//! Sluice delegation host
//!
//! Composition root shared by the `sluice-delegation` binary and by proxy
//! hosts that supply their own delegation capability.

pub mod pruner;
pub mod settings;

use anyhow::Result;
use pruner::RegistryPruner;
use settings::DaemonConfig;
use sluice_api_rpc::RpcServer;
use sluice_core::application::Delegator;
use sluice_core::port::DelegationCapability;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Build the delegator and apply the start-up cluster set
pub fn build_delegator(
    config: &DaemonConfig,
    capability: Option<Arc<dyn DelegationCapability>>,
) -> Arc<Delegator> {
    let delegator = Arc::new(Delegator::from_settings(&config.delegation, capability));

    for cluster in &config.clusters {
        let bound = delegator.on_cluster_added(cluster);
        info!(
            cluster_id = %cluster.cluster_id,
            destinations = cluster.destinations.len(),
            bound_destinations = bound,
            "Cluster loaded from configuration"
        );
    }

    delegator
}

/// Run the delegation host until Ctrl+C
pub async fn run(
    config: DaemonConfig,
    capability: Option<Arc<dyn DelegationCapability>>,
) -> Result<()> {
    let delegator = build_delegator(&config, capability);

    // 1. Start registry pruner
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pruner = RegistryPruner::new(delegator.clone(), config.delegation.prune_interval());
    let pruner_handle = tokio::spawn(pruner.run(shutdown_rx));

    // 2. Start JSON-RPC management server
    let rpc_handle = RpcServer::new(config.rpc.clone(), delegator.clone())
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(
        capability_available = delegator.is_available(),
        "System ready. Press Ctrl+C to shutdown"
    );

    // 3. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 4. Graceful shutdown
    let _ = shutdown_tx.send(true);
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), pruner_handle).await;

    info!("Shutdown complete.");

    Ok(())
}

//! JSON-RPC Server
//!
//! Implements the JSON-RPC 2.0 management server on localhost TCP.

use crate::handler::RpcHandler;
use crate::types::{
    ApplyClusterRequest, ListQueuesRequest, RemoveClusterRequest, ResetQueueRequest,
    StatsRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use serde::{Deserialize, Serialize};
use sluice_core::application::Delegator;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9627;

/// RPC Server Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, delegator: Arc<Delegator>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(delegator)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Security: management calls can reset live queues, so the server is
    /// expected to bind to a loopback address
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC management server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("admin.queue.reset.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ResetQueueRequest = params.parse()?;
                    handler.reset_queue(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.queue.list.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ListQueuesRequest = params.parse()?;
                    handler.list_queues(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.stats.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: StatsRequest = params.parse()?;
                    handler.stats(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("config.cluster.apply.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: ApplyClusterRequest = params.parse()?;
                    handler.apply_cluster(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("config.cluster.remove.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: RemoveClusterRequest = params.parse()?;
                    handler.remove_cluster(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        info!("JSON-RPC management server started successfully");

        let handle = server.start(module);
        Ok(handle)
    }
}

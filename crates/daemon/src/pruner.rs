//! Registry prune loop
//!
//! Queues are released as soon as their last destination goes away; this
//! loop only sweeps the dead registry entries they leave behind.

use sluice_core::application::Delegator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info};

/// Periodic registry pruner
pub struct RegistryPruner {
    delegator: Arc<Delegator>,
    period: Duration,
}

impl RegistryPruner {
    pub fn new(delegator: Arc<Delegator>, period: Duration) -> Self {
        Self { delegator, period }
    }

    /// Run until `shutdown` flips to true (spawn on the runtime)
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_secs = self.period.as_secs(), "Registry pruner started");

        let mut tick = interval(self.period);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let removed = self.delegator.prune();
                    debug!(removed, "Registry prune pass completed");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            if *shutdown.borrow() {
                break;
            }
        }

        info!("Registry pruner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::domain::{ClusterConfig, DestinationConfig};
    use sluice_core::port::delegation::mocks::MockDelegationCapability;
    use sluice_core::port::DelegationCapability;

    #[tokio::test]
    async fn test_pruner_stops_on_shutdown() {
        let capability: Arc<dyn DelegationCapability> = Arc::new(MockDelegationCapability::new());
        let delegator = Arc::new(Delegator::new(Some(capability)));
        delegator.on_cluster_added(&ClusterConfig::new(
            "c1",
            vec![DestinationConfig::new("d1").with_delegation("orders", "http://+:80/orders/")],
        ));

        let (tx, rx) = watch::channel(false);
        let pruner = RegistryPruner::new(delegator.clone(), Duration::from_millis(10));
        let handle = tokio::spawn(pruner.run(rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("pruner should stop")
            .unwrap();
        // Bound queues survive prune passes
        assert_eq!(delegator.stats().live_queues, 1);
    }
}

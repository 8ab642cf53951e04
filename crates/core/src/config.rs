// Delegation Settings (loaded by the composition root)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between registry prune passes (60s)
pub const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60;

/// Delegation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationSettings {
    /// When false the delegator runs as if the host had no capability
    pub enabled: bool,
    pub prune_interval_secs: u64,
}

impl DelegationSettings {
    pub fn prune_interval(&self) -> Duration {
        // A zero interval would spin the prune task
        Duration::from_secs(self.prune_interval_secs.max(1))
    }
}

impl Default for DelegationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prune_interval_secs: DEFAULT_PRUNE_INTERVAL_SECS,
        }
    }
}

//! Daemon configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `SLUICE__*` environment variables.
//!
//! ```text
//! SLUICE_CONFIG=/etc/sluice/config.toml \
//! SLUICE__RPC__PORT=9700 \
//!     ./sluice-delegation
//! ```

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use sluice_api_rpc::RpcServerConfig;
use sluice_core::config::DelegationSettings;
use sluice_core::domain::ClusterConfig;
use sluice_core::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "~/.sluice/config.toml";
const CONFIG_PATH_ENV: &str = "SLUICE_CONFIG";
const ENV_PREFIX: &str = "SLUICE";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub rpc: RpcServerConfig,
    pub delegation: DelegationSettings,
    /// Clusters applied once at start-up; later changes arrive over RPC
    pub clusters: Vec<ClusterConfig>,
}

impl DaemonConfig {
    /// Load from `SLUICE_CONFIG` (or the default path) plus environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_CONFIG_PATH).into_owned());

        let builder = Config::builder()
            .add_source(File::with_name(&path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    /// Parse an in-memory TOML document (no environment overlay)
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder
            .build()
            .and_then(|config| config.try_deserialize::<DaemonConfig>())
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rpc.host.trim().is_empty() {
            return Err(AppError::Config("rpc.host must not be empty".to_string()));
        }
        for cluster in &self.clusters {
            cluster.validate()?;
        }
        Ok(())
    }
}

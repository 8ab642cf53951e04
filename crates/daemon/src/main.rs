//! Sluice Delegation Host - Main Entry Point

use anyhow::Result;
use sluice_daemon::settings::DaemonConfig;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (SLUICE_LOG_FORMAT=json for production)
    let log_format = std::env::var("SLUICE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("sluice=info"))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Sluice delegation host v{} starting...", VERSION);

    // 2. Load configuration
    let config = DaemonConfig::load()?;

    // 3. Run. This binary ships no platform delegation backend; proxy hosts
    // that have one call `sluice_daemon::run` with it instead.
    sluice_daemon::run(config, None).await
}

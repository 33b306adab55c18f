//! Teleop link bridge entry point.
//!
//! Usage: `teleop-bridge [CONFIG.toml]`

mod app;
mod config;
mod network_file;

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting teleop bridge"
    );

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config::Config::load(path.as_deref())?;
    tracing::info!(
        host = %config.network.ip_address,
        tick_hz = config.tick_hz,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("bridge shut down cleanly");
    Ok(())
}

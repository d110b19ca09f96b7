//! Chatter viewer - headless client for the chatter world

mod config;
mod session;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config first: it carries the fallback log filter
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .init();

    info!("Chatter viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration");
    info!("  Server: {}", config.connection.url);
    info!("  Face: {}", config.connection.face);
    info!("  Frame rate: {} fps", config.render.fps);

    session::run(config).await?;

    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use subsync_server::{app, config::ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "subsyncd", version, about = "Submodule pointer sync webhook server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "SUBSYNC_CONFIG", default_value = "subsync.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    app::run(config).await
}

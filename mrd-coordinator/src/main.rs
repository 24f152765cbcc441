use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use common::registry::WorkerRegistry;
use mrd_coordinator::args::Args;
use mrd_coordinator::core::{serve, CoordinatorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let registry = WorkerRegistry::from_file(&args.workers)?;
    info!(workers = registry.len(), roster = %args.workers.display(), "roster loaded");

    let config = CoordinatorConfig {
        registry: Arc::new(registry),
        command_timeout: Duration::from_secs(args.timeout),
    };

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve(args.port, config, shutdown.clone()));

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    shutdown.cancel();
    server.await??;

    Ok(())
}

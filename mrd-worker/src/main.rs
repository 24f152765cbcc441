use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mrd_worker::args::Args;
use mrd_worker::core::{serve, WorkerContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let context = WorkerContext {
        name: args.name,
        storage_root: args.storage,
        shuffle_timeout: Duration::from_secs(args.timeout),
    };

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve(args.port, context, shutdown.clone()));

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    shutdown.cancel();
    server.await??;

    Ok(())
}

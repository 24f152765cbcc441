//! The coordinator's client endpoint.
//!
//! One connection per job: the client writes a job request, the coordinator
//! runs both phases, writes back a single terminal reply, and closes the
//! connection. Jobs are handled one at a time; the per-worker stores are
//! phase-scoped and would conflict between concurrent jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use common::codec;
use common::protocol::{JobReply, JobRequest};
use common::registry::WorkerRegistry;

use crate::jobs::run_job;

/// Coordinator runtime configuration.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub registry: Arc<WorkerRegistry>,
    pub command_timeout: Duration,
}

/// Bind the coordinator and serve client jobs until `shutdown` fires.
pub async fn serve(
    port: u16,
    config: CoordinatorConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(listener, config, shutdown).await
}

/// Serve client jobs on an already-bound listener.
pub async fn serve_on(
    listener: TcpListener,
    config: CoordinatorConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, workers = config.registry.len(), "listening for job submissions");

    loop {
        select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "client connected");
                        handle_client(stream, &config).await;
                    }
                    Err(e) => warn!("error while listening for incoming connections: {e}"),
                }
            }
        }
    }

    info!("shutting down");
    Ok(())
}

/// Read one job request, run it, and write the terminal reply.
async fn handle_client(stream: TcpStream, config: &CoordinatorConfig) {
    let mut frames = codec::frames(stream);

    let request: JobRequest = match codec::recv_message(&mut frames).await {
        Ok(request) => request,
        Err(e) => {
            warn!("received invalid job request: {e}");
            return;
        }
    };

    info!(map = %request.map.workload, reduce = %request.reduce.workload, "job accepted");

    let reply = match run_job(&config.registry, &request, config.command_timeout).await {
        Ok(result) => JobReply::Completed(result),
        Err(e) => {
            warn!("job failed: {e}");
            JobReply::Failed {
                reason: e.to_string(),
            }
        }
    };

    if let Err(e) = codec::send_message(&mut frames, &reply).await {
        warn!("failed to send job reply: {e}");
    }
}

//! The worker server: accepts one remote command per connection, executes
//! it, and writes the reply back on the same connection.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use common::codec;
use common::protocol::{CommandReply, RemoteCommand};

use crate::{map, reduce, shuffle};

/// Everything a command needs from the hosting worker process.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    /// This worker's name; commands addressed to other names are refused.
    pub name: String,

    /// Root directory of the local stores and partition data.
    pub storage_root: PathBuf,

    /// Timeout for shuffle requests this worker issues while reducing.
    pub shuffle_timeout: Duration,
}

/// Bind the worker server and run it until `shutdown` fires.
pub async fn serve(
    port: u16,
    context: WorkerContext,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(listener, context, shutdown).await
}

/// Run the worker server on an already-bound listener.
///
/// Each accepted connection carries exactly one command and is handled
/// concurrently with the others. Inbound handling is never capped: a reduce
/// command shuffles from every map worker, this one included, so a cap here
/// would deadlock a reduce against its own shuffle connection. The dispatch
/// fan-outs bound their own concurrency on the sending side.
pub async fn serve_on(
    listener: TcpListener,
    context: WorkerContext,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(worker = %context.name, %addr, "listening for incoming commands");

    let context = Arc::new(context);
    let tracker = TaskTracker::new();

    loop {
        select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted command connection");
                        let context = context.clone();
                        tracker.spawn(async move {
                            handle_connection(stream, &context).await;
                        });
                    }
                    Err(e) => warn!("error while listening for incoming connections: {e}"),
                }
            }
        }
    }

    info!(worker = %context.name, "shutting down");
    tracker.close();
    tracker.wait().await;
    Ok(())
}

/// Decode exactly one command from the connection, execute it, and reply.
///
/// A decode failure closes the connection without executing anything. An
/// execution failure is reported back as [`CommandReply::Failed`] and
/// aborts only this command.
async fn handle_connection(stream: TcpStream, context: &WorkerContext) {
    let mut frames = codec::frames(stream);

    let command: RemoteCommand = match codec::recv_message(&mut frames).await {
        Ok(command) => command,
        Err(e) => {
            warn!(worker = %context.name, "received invalid command: {e}");
            return;
        }
    };

    let kind = command.kind();
    let reply = execute(command, context).await;
    if let CommandReply::Failed(reason) = &reply {
        warn!(worker = %context.name, kind, "command failed: {reason}");
    }

    if let Err(e) = codec::send_message(&mut frames, &reply).await {
        warn!(worker = %context.name, kind, "failed to send reply: {e}");
    }
}

/// Dispatch one command to its executor.
pub async fn execute(command: RemoteCommand, context: &WorkerContext) -> CommandReply {
    match command {
        RemoteCommand::ExecuteMap {
            task,
            worker,
            partitions,
        } => {
            if worker != context.name {
                return CommandReply::Failed(format!(
                    "map command addressed to `{}` received by `{}`",
                    worker, context.name
                ));
            }
            match map::perform_map(&task, &worker, &partitions, &context.storage_root) {
                Ok(()) => CommandReply::Done,
                Err(e) => CommandReply::Failed(format!("{e:#}")),
            }
        }

        RemoteCommand::ExecuteShuffle {
            reducer_index,
            num_reducers,
        } => match shuffle::perform_shuffle(
            reducer_index,
            num_reducers,
            &context.name,
            &context.storage_root,
        ) {
            Ok(pairs) => CommandReply::Pairs(pairs),
            Err(e) => CommandReply::Failed(format!("{e:#}")),
        },

        RemoteCommand::ExecuteReduce {
            task,
            num_reducers,
            reducer_index,
            map_workers,
            worker,
        } => {
            if worker != context.name {
                return CommandReply::Failed(format!(
                    "reduce command addressed to `{}` received by `{}`",
                    worker, context.name
                ));
            }
            match reduce::perform_reduce(
                &task,
                num_reducers,
                reducer_index,
                &map_workers,
                &worker,
                &context.storage_root,
                context.shuffle_timeout,
            )
            .await
            {
                Ok(()) => CommandReply::Done,
                Err(e) => CommandReply::Failed(format!("{e:#}")),
            }
        }
    }
}

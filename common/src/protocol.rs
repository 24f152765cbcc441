//! The remote command protocol.
//!
//! A command is serialized, sent to a worker's endpoint as one frame, and
//! executed there; the worker writes one reply frame back on the same
//! connection and closes it. The protocol itself never retries: every
//! exchange is at-most-once, and retry is a policy decision left to the
//! caller (the coordinator's phase loops).

use std::fmt;
use std::sync::Arc;
use std::thread::available_parallelism;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::codec;
use crate::registry::WorkerDescriptor;
use crate::KeyValue;

/// Default per-command timeout, overridable from each binary's CLI.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Everything that can go wrong during one command exchange.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Connection refused/reset/EOF mid-exchange.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The peer sent a frame we could not decode.
    #[error("decode failure: {0}")]
    Decode(#[source] bincode::Error),

    /// We could not encode our own message.
    #[error("encode failure: {0}")]
    Encode(#[source] bincode::Error),

    /// The peer closed the connection before a reply arrived.
    #[error("connection closed before a reply arrived")]
    ConnectionClosed,

    /// The exchange did not complete within the configured timeout.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// The command was delivered and executed, but failed on the worker.
    #[error("command execution failed: {reason}")]
    Execution { reason: String },
}

/// A named task to run on a worker. Task code cannot cross the wire, so a
/// task names a registered workload and carries its auxiliary arguments;
/// the executing worker resolves the name against its workload registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskSpec {
    pub workload: String,
    pub aux: Vec<String>,
}

impl TaskSpec {
    pub fn new(workload: impl Into<String>) -> Self {
        Self {
            workload: workload.into(),
            aux: Vec::new(),
        }
    }
}

/// A unit of work executed remotely by a worker.
///
/// Carries everything needed to run on the receiving side and nothing that
/// must be resolved locally. Created by the coordinator (map/reduce) or by a
/// reduce executor (shuffle), transmitted once, executed exactly once by the
/// receiving worker, then discarded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RemoteCommand {
    /// Run the map task over the partitions assigned to this worker,
    /// rebuilding its intermediate store.
    ExecuteMap {
        task: TaskSpec,
        /// Name of the executing worker; keys its on-disk store.
        worker: String,
        /// Partitions assigned to this worker for this job.
        partitions: Vec<String>,
    },

    /// Pull this reducer's key subset from every map worker, group by key,
    /// run the reduce task, and rebuild the final store.
    ExecuteReduce {
        task: TaskSpec,
        num_reducers: u32,
        /// This worker's bucket in `[0, num_reducers)`.
        reducer_index: u32,
        /// The map-phase survivors to shuffle from.
        map_workers: Vec<WorkerDescriptor>,
        /// Name of the executing worker; keys its on-disk store.
        worker: String,
    },

    /// Return the subset of this worker's intermediate store whose keys hash
    /// to the requesting reducer.
    ExecuteShuffle { reducer_index: u32, num_reducers: u32 },
}

impl RemoteCommand {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteCommand::ExecuteMap { .. } => "map",
            RemoteCommand::ExecuteReduce { .. } => "reduce",
            RemoteCommand::ExecuteShuffle { .. } => "shuffle",
        }
    }
}

/// The reply written back by the worker for one command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandReply {
    /// The command completed with no payload (map, reduce).
    Done,

    /// The command completed with a pair subset (shuffle).
    Pairs(Vec<KeyValue>),

    /// The command was executed and failed on the worker.
    Failed(String),
}

/////////////////////////////////////////////////////////////////////////////
// Client <-> coordinator messages
/////////////////////////////////////////////////////////////////////////////

/// A job submission: the map task followed by the reduce task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobRequest {
    pub map: TaskSpec,
    pub reduce: TaskSpec,
}

/// Location of one final-output file, as reported to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLocation {
    pub file: String,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for OutputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}:{}", self.file, self.host, self.port)
    }
}

/// The final descriptor locating every output file of a completed job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobResult {
    pub outputs: Vec<OutputLocation>,
}

/// Terminal answer for one job submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobReply {
    Completed(JobResult),
    Failed { reason: String },
}

/////////////////////////////////////////////////////////////////////////////
// Command dispatch
/////////////////////////////////////////////////////////////////////////////

/// Send one command to one worker and wait for its reply.
///
/// The connection is opened, the command frame is written and flushed, and
/// only then is the reply read; the whole exchange is bounded by `timeout`.
/// A `CommandReply::Failed` from the worker surfaces as
/// [`ProtocolError::Execution`].
pub async fn send_command(
    addr: &str,
    command: &RemoteCommand,
    timeout: Duration,
) -> Result<CommandReply, ProtocolError> {
    let exchange = async {
        let stream = TcpStream::connect(addr).await?;
        let mut frames = codec::frames(stream);
        codec::send_message(&mut frames, command).await?;
        let reply: CommandReply = codec::recv_message(&mut frames).await?;
        match reply {
            CommandReply::Failed(reason) => Err(ProtocolError::Execution { reason }),
            reply => Ok(reply),
        }
    };
    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout(timeout)),
    }
}

/// Pool size for one dispatch round: one slot per target, capped at the
/// available hardware parallelism.
pub fn pool_size(targets: usize) -> usize {
    let cpus = available_parallelism().map(|n| n.get()).unwrap_or(1);
    cpus.min(targets).max(1)
}

/// Dispatch one command per target worker concurrently, bounded by
/// [`pool_size`], and collect every outcome.
///
/// The round blocks until all members complete or fail; no ordering is
/// guaranteed between peers within the round.
pub async fn broadcast(
    commands: Vec<(WorkerDescriptor, RemoteCommand)>,
    timeout: Duration,
) -> Vec<(WorkerDescriptor, Result<CommandReply, ProtocolError>)> {
    let limit = Arc::new(Semaphore::new(pool_size(commands.len())));

    let exchanges = commands.into_iter().map(|(worker, command)| {
        let limit = limit.clone();
        async move {
            let _permit = limit.acquire().await.expect("dispatch semaphore closed");
            debug!(worker = %worker.name, kind = command.kind(), "dispatching command");
            let result = send_command(&worker.addr(), &command, timeout).await;
            (worker, result)
        }
    });

    join_all(exchanges).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn unresponsive_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        // Accept the connection and hold it open without ever replying.
        let hold = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(stream);
        });

        let command = RemoteCommand::ExecuteShuffle {
            reducer_index: 0,
            num_reducers: 1,
        };
        let timeout = Duration::from_millis(200);
        let result = send_command(&addr, &command, timeout).await;
        assert!(matches!(result, Err(ProtocolError::Timeout(t)) if t == timeout));

        hold.abort();
    }

    #[test]
    fn pool_size_is_at_least_one_and_at_most_the_target_count() {
        assert_eq!(pool_size(0), 1);
        assert_eq!(pool_size(1), 1);
        assert!(pool_size(4) <= 4);
        assert!(pool_size(1024) >= 1);
    }
}

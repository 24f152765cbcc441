//! Job orchestration: the two-phase state machine with per-phase retry.
//!
//! Each phase dispatches one command per roster worker concurrently, waits
//! for the whole round, removes every worker that failed, and re-runs the
//! round from scratch against the survivors. A phase succeeds only once an
//! entire round completes with zero failures; a phase whose roster empties
//! fails the job explicitly.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use common::protocol::{
    broadcast, CommandReply, JobRequest, JobResult, OutputLocation, ProtocolError, RemoteCommand,
};
use common::registry::{assign_partitions, WorkerDescriptor, WorkerRegistry};
use common::store::final_output_path;

/// The stage of a job a failure occurred in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => write!(f, "map"),
            Phase::Reduce => write!(f, "reduce"),
        }
    }
}

/// Terminal failure of a job; reported to the client, never left hanging.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{0} phase ran out of workers")]
    RosterExhausted(Phase),
}

/// Run one job to completion against the supplied roster.
///
/// The registry itself is read-only; the phase loops mutate their own local
/// rosters. The map phase must fully complete, including retries, before the
/// reduce phase is dispatched.
pub async fn run_job(
    registry: &WorkerRegistry,
    request: &JobRequest,
    timeout: Duration,
) -> Result<JobResult, JobError> {
    let map_survivors = run_map_phase(registry, request, timeout).await?;

    // The reduce roster starts from the full registry again; a worker that
    // failed a map command may still be able to reduce.
    let reduce_survivors = run_reduce_phase(
        registry.workers().to_vec(),
        &map_survivors,
        request,
        timeout,
    )
    .await?;

    let outputs = reduce_survivors
        .into_iter()
        .map(|worker| OutputLocation {
            file: final_output_path(&worker.name),
            host: worker.host,
            port: worker.port,
        })
        .collect();
    Ok(JobResult { outputs })
}

/// Drive the map phase to a clean round, returning the surviving roster.
async fn run_map_phase(
    registry: &WorkerRegistry,
    request: &JobRequest,
    timeout: Duration,
) -> Result<Vec<WorkerDescriptor>, JobError> {
    let mut roster = registry.workers().to_vec();
    loop {
        if roster.is_empty() {
            return Err(JobError::RosterExhausted(Phase::Map));
        }

        info!(workers = roster.len(), "dispatching map round");
        let mut assignment = assign_partitions(&roster, registry.workers());
        let commands = roster
            .iter()
            .map(|worker| {
                let partitions = assignment.remove(&worker.name).unwrap_or_default();
                (
                    worker.clone(),
                    RemoteCommand::ExecuteMap {
                        task: request.map.clone(),
                        worker: worker.name.clone(),
                        partitions,
                    },
                )
            })
            .collect();

        let failed = failed_workers(broadcast(commands, timeout).await, Phase::Map);
        if failed.is_empty() {
            info!(workers = roster.len(), "map phase complete");
            return Ok(roster);
        }
        roster.retain(|worker| !failed.contains(&worker.name));
    }
}

/// Drive the reduce phase to a clean round, returning the surviving roster.
///
/// Reducer indices are reassigned every round from each worker's position in
/// the current roster, so the key-space cover stays exact as the roster
/// shrinks.
async fn run_reduce_phase(
    mut roster: Vec<WorkerDescriptor>,
    map_workers: &[WorkerDescriptor],
    request: &JobRequest,
    timeout: Duration,
) -> Result<Vec<WorkerDescriptor>, JobError> {
    loop {
        if roster.is_empty() {
            return Err(JobError::RosterExhausted(Phase::Reduce));
        }

        info!(workers = roster.len(), "dispatching reduce round");
        let num_reducers = roster.len() as u32;
        let commands = roster
            .iter()
            .enumerate()
            .map(|(index, worker)| {
                (
                    worker.clone(),
                    RemoteCommand::ExecuteReduce {
                        task: request.reduce.clone(),
                        num_reducers,
                        reducer_index: index as u32,
                        map_workers: map_workers.to_vec(),
                        worker: worker.name.clone(),
                    },
                )
            })
            .collect();

        let failed = failed_workers(broadcast(commands, timeout).await, Phase::Reduce);
        if failed.is_empty() {
            info!(workers = roster.len(), "reduce phase complete");
            return Ok(roster);
        }
        roster.retain(|worker| !failed.contains(&worker.name));
    }
}

/// Collect the names of every worker whose command failed in a round.
fn failed_workers(
    outcomes: Vec<(WorkerDescriptor, Result<CommandReply, ProtocolError>)>,
    phase: Phase,
) -> Vec<String> {
    let mut failed = Vec::new();
    for (worker, outcome) in outcomes {
        if let Err(e) = outcome {
            warn!(worker = %worker.name, %phase, "removing worker from roster: {e}");
            failed.push(worker.name);
        }
    }
    failed
}

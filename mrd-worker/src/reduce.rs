//! The reduce executor.
//!
//! Pulls this reducer's key subset from every map worker concurrently,
//! groups the combined pairs by key, runs the named reduce function once
//! per key, and writes each emission to this worker's final store.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail};
use tracing::info;

use common::protocol::{broadcast, CommandReply, RemoteCommand, TaskSpec};
use common::registry::WorkerDescriptor;
use common::store::{RecordWriter, WorkerStorage};
use common::KeyValue;

/// Execute a reduce command on this worker.
///
/// Any single shuffle request failing aborts the whole command; partial
/// shuffle results are never reduced.
pub async fn perform_reduce(
    task: &TaskSpec,
    num_reducers: u32,
    reducer_index: u32,
    map_workers: &[WorkerDescriptor],
    worker: &str,
    storage_root: &Path,
    shuffle_timeout: Duration,
) -> anyhow::Result<()> {
    info!(worker, workload = %task.workload, reducer_index, num_reducers, "starting reduce task");

    let workload = workload::try_named(&task.workload)
        .ok_or_else(|| anyhow!("the workload `{}` is not a known workload", task.workload))?;

    let subsets = shuffle_from(map_workers, reducer_index, num_reducers, shuffle_timeout).await?;
    let groups = group_by_key(subsets);

    let storage = WorkerStorage::new(storage_root, worker);
    let mut out = RecordWriter::create(&storage.final_path())?;

    let mut keys = 0usize;
    for (key, values) in groups {
        let value = (workload.reduce_fn)(key.clone(), Box::new(values.into_iter()), &task.aux)?;
        out.append(&KeyValue::new(key, value))?;
        keys += 1;
    }

    info!(worker, keys, "reduce task done");
    Ok(())
}

/// Issue one shuffle request to every map worker concurrently and collect
/// the returned subsets.
async fn shuffle_from(
    map_workers: &[WorkerDescriptor],
    reducer_index: u32,
    num_reducers: u32,
    timeout: Duration,
) -> anyhow::Result<Vec<Vec<KeyValue>>> {
    let commands = map_workers
        .iter()
        .map(|worker| {
            (
                worker.clone(),
                RemoteCommand::ExecuteShuffle {
                    reducer_index,
                    num_reducers,
                },
            )
        })
        .collect();

    let mut subsets = Vec::with_capacity(map_workers.len());
    for (worker, result) in broadcast(commands, timeout).await {
        match result {
            Ok(CommandReply::Pairs(pairs)) => subsets.push(pairs),
            Ok(reply) => bail!("unexpected shuffle reply from `{}`: {:?}", worker.name, reply),
            Err(e) => bail!("shuffle from `{}` failed: {}", worker.name, e),
        }
    }
    Ok(subsets)
}

/// Merge the shuffled subsets and collect every value emitted under each
/// key, preserving first-seen key order.
fn group_by_key(subsets: Vec<Vec<KeyValue>>) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();

    for pair in subsets.into_iter().flatten() {
        let KeyValue { key, value } = pair;
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(value);
    }

    order
        .into_iter()
        .map(|key| {
            let values = groups.remove(&key).expect("group exists for every ordered key");
            (key, values)
        })
        .collect()
}

//! The map executor.
//!
//! Streams every file of every assigned partition through the named map
//! function and appends each emission to this worker's intermediate store.
//! The store is truncated first, so re-running the command leaves it exactly
//! as a single run would.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use tracing::{info, warn};

use common::protocol::TaskSpec;
use common::store::{RecordWriter, WorkerStorage};
use common::KeyValue;

/// Execute a map command on this worker.
///
/// An unreadable input file is logged and skipped; the command still
/// completes. Errors from the map function itself, or from the intermediate
/// store, fail the command.
pub fn perform_map(
    task: &TaskSpec,
    worker: &str,
    partitions: &[String],
    storage_root: &Path,
) -> anyhow::Result<()> {
    info!(worker, workload = %task.workload, ?partitions, "starting map task");

    let workload = workload::try_named(&task.workload)
        .ok_or_else(|| anyhow!("the workload `{}` is not a known workload", task.workload))?;

    let storage = WorkerStorage::new(storage_root, worker);
    let mut out = RecordWriter::create(&storage.intermediate_path())?;

    let mut emitted = 0usize;
    for partition in partitions {
        let dir = storage.partition_dir(partition);
        let mut files: Vec<_> = fs::read_dir(&dir)
            .with_context(|| format!("failed to list partition `{}` at {}", partition, dir.display()))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        files.sort();

        for path in files {
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!(worker, file = %path.display(), "skipping unreadable input file: {e}");
                    continue;
                }
            };

            let input = KeyValue::new(path.display().to_string(), contents);
            let emissions = (workload.map_fn)(input, &task.aux)?;
            for emission in emissions {
                out.append(&emission?)?;
                emitted += 1;
            }
        }
    }

    info!(worker, emitted, "map task done");
    Ok(())
}

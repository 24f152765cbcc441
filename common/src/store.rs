//! Per-worker record stores.
//!
//! Each worker keeps two append-only key/value record files under its own
//! directory: the intermediate store written by the map phase and the final
//! store written by the reduce phase. Records are JSON lines, written
//! unbuffered so partial progress survives a worker crash. A store is
//! truncated and recreated at the start of the phase that owns it.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::KeyValue;

/// Default storage root, relative to the worker's working directory.
pub const STORAGE_ROOT: &str = "worker_storage";

/// File name of the intermediate store, fixed by convention.
pub const INTERMEDIATE_FILE: &str = "intermediate.txt";

/// File name of the final store, fixed by convention; the client locates
/// output through this name.
pub const FINAL_FILE: &str = "final.txt";

/// Conventional path of a worker's final-output file, as exposed to the
/// client in a job result.
pub fn final_output_path(worker: &str) -> String {
    format!("{}/{}/final_results/{}", STORAGE_ROOT, worker, FINAL_FILE)
}

/// The on-disk layout of one worker's storage, keyed by worker name.
#[derive(Clone, Debug)]
pub struct WorkerStorage {
    base: PathBuf,
}

impl WorkerStorage {
    pub fn new(root: &Path, worker: &str) -> Self {
        Self {
            base: root.join(worker),
        }
    }

    /// Directory holding the input files of one owned partition.
    pub fn partition_dir(&self, partition: &str) -> PathBuf {
        self.base.join("partitions").join(partition)
    }

    pub fn intermediate_path(&self) -> PathBuf {
        self.base.join("intermediate_results").join(INTERMEDIATE_FILE)
    }

    pub fn final_path(&self) -> PathBuf {
        self.base.join("final_results").join(FINAL_FILE)
    }
}

/// Writes records to a store file, truncating any previous contents.
///
/// Every append goes straight to the file, no cross-record buffering.
pub struct RecordWriter {
    file: File,
}

impl RecordWriter {
    /// Truncate (or create) the store at `path` and open it for appending.
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create store file {}", path.display()))?;
        Ok(Self { file })
    }

    /// Append one record and push it to the OS immediately.
    pub fn append(&mut self, record: &KeyValue) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Read every record of a store file, in append order.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<KeyValue>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open store file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let record: KeyValue = serde_json::from_str(&line)
            .with_context(|| format!("malformed record in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

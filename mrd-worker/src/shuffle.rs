//! The shuffle responder.
//!
//! Given a requesting reducer's bucket and the total reducer count, scans
//! this worker's intermediate store and returns exactly the records whose
//! keys hash to that bucket. Every worker routes through the same hash, so
//! the buckets partition the key space with no loss and no duplication.

use std::path::Path;

use anyhow::ensure;
use tracing::debug;

use common::store::{read_records, WorkerStorage};
use common::{reducer_for, KeyValue};

/// Execute a shuffle command on this worker.
///
/// An I/O error while reading the intermediate store fails the command; the
/// failure travels back to the requesting reduce worker.
pub fn perform_shuffle(
    reducer_index: u32,
    num_reducers: u32,
    worker: &str,
    storage_root: &Path,
) -> anyhow::Result<Vec<KeyValue>> {
    ensure!(num_reducers > 0, "shuffle requested with zero reducers");
    ensure!(
        reducer_index < num_reducers,
        "reducer index {} out of range for {} reducers",
        reducer_index,
        num_reducers
    );

    let storage = WorkerStorage::new(storage_root, worker);
    let records = read_records(&storage.intermediate_path())?;

    let subset: Vec<KeyValue> = records
        .into_iter()
        .filter(|kv| reducer_for(kv.key(), num_reducers) == reducer_index)
        .collect();

    debug!(worker, reducer_index, num_reducers, pairs = subset.len(), "shuffle subset ready");
    Ok(subset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::RecordWriter;
    use std::collections::HashSet;

    fn seed_store(root: &Path, worker: &str, pairs: &[KeyValue]) {
        let path = WorkerStorage::new(root, worker).intermediate_path();
        let mut writer = RecordWriter::create(&path).unwrap();
        for pair in pairs {
            writer.append(pair).unwrap();
        }
    }

    fn sample_pairs() -> Vec<KeyValue> {
        ["apple", "banana", "cherry", "date", "apple", "fig", "grape"]
            .iter()
            .enumerate()
            .map(|(i, key)| KeyValue::new(*key, i.to_string()))
            .collect()
    }

    #[test]
    fn subsets_cover_the_store_without_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = sample_pairs();
        seed_store(dir.path(), "worker1", &pairs);

        let n = 3;
        let mut union: Vec<KeyValue> = Vec::new();
        let mut keys_seen: Vec<HashSet<String>> = Vec::new();
        for index in 0..n {
            let subset = perform_shuffle(index, n, "worker1", dir.path()).unwrap();
            keys_seen.push(subset.iter().map(|kv| kv.key().to_string()).collect());
            union.extend(subset);
        }

        // No key reaches two different reducers.
        for i in 0..keys_seen.len() {
            for j in (i + 1)..keys_seen.len() {
                assert!(keys_seen[i].is_disjoint(&keys_seen[j]));
            }
        }

        // Nothing lost, nothing duplicated.
        let expected: Vec<KeyValue> = pairs;
        let mut union_sorted = union;
        union_sorted.sort_by(|a, b| (a.key(), a.value()).cmp(&(b.key(), b.value())));
        let mut expected_sorted = expected;
        expected_sorted.sort_by(|a, b| (a.key(), a.value()).cmp(&(b.key(), b.value())));
        assert_eq!(union_sorted, expected_sorted);
    }

    #[test]
    fn routing_matches_the_partition_function() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(dir.path(), "worker1", &[KeyValue::new("apple", "1")]);

        let n = 3;
        let owner = reducer_for("apple", n);
        for index in 0..n {
            let subset = perform_shuffle(index, n, "worker1", dir.path()).unwrap();
            if index == owner {
                assert_eq!(subset, vec![KeyValue::new("apple", "1")]);
            } else {
                assert!(subset.is_empty());
            }
        }
    }

    #[test]
    fn missing_store_is_a_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        assert!(perform_shuffle(0, 1, "worker1", dir.path()).is_err());
    }

    #[test]
    fn zero_reducers_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(perform_shuffle(0, 0, "worker1", dir.path()).is_err());
    }
}

//! The static worker roster and the partition-to-worker assignment.
//!
//! The roster is supplied once at startup (a JSON file naming each worker's
//! identity, endpoint and owned partitions) and is read-only for the
//! lifetime of a job. The coordinator's phase loops work on their own
//! shrinking copies of it.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One worker in the cluster: identity, endpoint, and the partitions it
/// physically stores. Immutable for the duration of a job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Names of the input partitions this worker owns. A partition may be
    /// replicated, in which case it appears on several descriptors.
    #[serde(default)]
    pub partitions: Vec<String>,
}

impl WorkerDescriptor {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Registry for workers, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct WorkerRegistry {
    workers: Vec<WorkerDescriptor>,
}

impl WorkerRegistry {
    pub fn new(workers: Vec<WorkerDescriptor>) -> Self {
        Self { workers }
    }

    /// Load the roster from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read worker roster {}", path.display()))?;
        let workers: Vec<WorkerDescriptor> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse worker roster {}", path.display()))?;
        let registry = Self { workers };
        anyhow::ensure!(!registry.is_empty(), "worker roster {} is empty", path.display());
        Ok(registry)
    }

    pub fn workers(&self) -> &[WorkerDescriptor] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Assign every partition known to the cluster to exactly one of its owners
/// present in `roster`, choosing uniformly at random among the owners of a
/// replicated partition. Every roster worker gets an entry, possibly empty.
///
/// `universe` is the full registry; a partition whose every owner has left
/// the roster cannot be assigned, and is dropped from the round with a
/// warning.
pub fn assign_partitions(
    roster: &[WorkerDescriptor],
    universe: &[WorkerDescriptor],
) -> HashMap<String, Vec<String>> {
    let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
    for worker in roster {
        for partition in &worker.partitions {
            owners.entry(partition).or_default().push(&worker.name);
        }
    }

    let mut known: Vec<&str> = universe
        .iter()
        .flat_map(|w| w.partitions.iter().map(String::as_str))
        .collect();
    known.sort_unstable();
    known.dedup();

    let mut assignment: HashMap<String, Vec<String>> = roster
        .iter()
        .map(|w| (w.name.clone(), Vec::new()))
        .collect();

    let mut rng = rand::thread_rng();
    for partition in known {
        match owners.get(partition).and_then(|o| o.choose(&mut rng)) {
            Some(owner) => assignment
                .get_mut(*owner)
                .expect("assignment entry exists for every roster worker")
                .push(partition.to_string()),
            None => warn!(partition, "partition has no owner left in the roster"),
        }
    }

    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(name: &str, partitions: &[&str]) -> WorkerDescriptor {
        WorkerDescriptor {
            name: name.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn every_partition_assigned_exactly_once_to_an_owner() {
        let roster = vec![
            worker("worker1", &["p1", "p2", "shared"]),
            worker("worker2", &["p3", "shared"]),
            worker("worker3", &["p4"]),
        ];

        // Random owner choice: exercise it repeatedly.
        for _ in 0..50 {
            let assignment = assign_partitions(&roster, &roster);
            assert_eq!(assignment.len(), 3);

            let mut seen: Vec<&str> = Vec::new();
            for (name, partitions) in &assignment {
                let owner = roster.iter().find(|w| &w.name == name).unwrap();
                for partition in partitions {
                    assert!(
                        owner.partitions.contains(partition),
                        "{} assigned to non-owner {}",
                        partition,
                        name
                    );
                    seen.push(partition);
                }
            }
            seen.sort_unstable();
            assert_eq!(seen, vec!["p1", "p2", "p3", "p4", "shared"]);
        }
    }

    #[test]
    fn replicated_partition_lands_on_each_owner_eventually() {
        let roster = vec![worker("worker1", &["shared"]), worker("worker2", &["shared"])];
        let mut hit = [false, false];
        for _ in 0..200 {
            let assignment = assign_partitions(&roster, &roster);
            if !assignment["worker1"].is_empty() {
                hit[0] = true;
            }
            if !assignment["worker2"].is_empty() {
                hit[1] = true;
            }
        }
        assert_eq!(hit, [true, true], "uniform choice never picked one owner");
    }

    #[test]
    fn orphaned_partition_is_dropped_from_the_round() {
        // worker2 owns the only replica of p2 and has left the roster.
        let universe = vec![worker("worker1", &["p1"]), worker("worker2", &["p2"])];
        let roster = vec![universe[0].clone()];

        let assignment = assign_partitions(&roster, &universe);
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment["worker1"], vec!["p1".to_string()]);
    }

    #[test]
    fn orphaned_replica_falls_back_to_the_surviving_owner() {
        // "shared" is replicated; only one replica owner is still rostered.
        let universe = vec![
            worker("worker1", &["shared"]),
            worker("worker2", &["shared"]),
        ];
        let roster = vec![universe[0].clone()];

        for _ in 0..50 {
            let assignment = assign_partitions(&roster, &universe);
            assert_eq!(assignment["worker1"], vec!["shared".to_string()]);
        }
    }

    #[test]
    fn empty_roster_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workers.json");
        std::fs::write(&path, "[]").unwrap();

        let err = WorkerRegistry::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn roster_parses_from_json() {
        let raw = r#"[
            {"name": "worker1", "host": "10.0.0.1", "port": 9001, "partitions": ["p1"]},
            {"name": "worker2", "host": "10.0.0.2", "port": 9002}
        ]"#;
        let workers: Vec<WorkerDescriptor> = serde_json::from_str(raw).unwrap();
        assert_eq!(workers[0].addr(), "10.0.0.1:9001");
        assert!(workers[1].partitions.is_empty());
    }
}

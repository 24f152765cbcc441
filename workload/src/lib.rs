//! MapReduce applications that can run on the cluster.
//!
//! Task code never crosses the wire; jobs name a workload and the executing
//! worker resolves it here.

use common::Workload;

pub mod word_count;
pub mod word_prefix;

/// Look up a workload by name.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" | "wordcount" => Some(Workload {
            map_fn: word_count::map,
            reduce_fn: word_count::reduce,
        }),
        "wordprefix" => Some(Workload {
            map_fn: word_prefix::map,
            reduce_fn: word_prefix::reduce,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_workloads_resolve() {
        assert!(try_named("wordcount").is_some());
        assert!(try_named("wc").is_some());
        assert!(try_named("wordprefix").is_some());
    }

    #[test]
    fn unknown_workload_is_none() {
        assert!(try_named("no-such-workload").is_none());
    }
}

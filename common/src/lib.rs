//! Shared types for the map/reduce cluster: the key/value record model,
//! the pluggable map/reduce function signatures, the deterministic shuffle
//! hash, and the wire protocol spoken between the coordinator, the workers
//! and the client.

use std::fmt;
use std::fmt::Formatter;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

pub mod codec;
pub mod protocol;
pub mod registry;
pub mod store;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accomodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes one input item (the file name as the key, the file
/// contents as the value) and auxiliary arguments.
///
/// It returns an iterator that yields new key-value pairs.
pub type MapFn = fn(kv: KeyValue, aux: &[String]) -> MapOutput;

/// A reduce function takes in a key, an iterator over all values collected
/// for that key, and auxiliary arguments. It returns an [`anyhow::Result`]
/// containing the single output value for that key.
pub type ReduceFn = fn(
    key: String,
    values: Box<dyn Iterator<Item = String> + '_>,
    aux: &[String],
) -> anyhow::Result<String>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair. Equality is exact (key, value) equality.
///
/// Used uniformly as the record format for the intermediate and final
/// stores and on the wire.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key.
    pub key: String,

    /// The value.
    pub value: String,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.key, self.value)
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the key of this key-value pair.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the value of this key-value pair.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consumes the key-value pair and returns the key.
    #[inline]
    pub fn into_key(self) -> String {
        self.key
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> String {
        self.value
    }
}

/// Hashes an intermediate key.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::with_key(0);
    hasher.write(key);
    let value = hasher.finish() & 0x7fffffff;
    u32::try_from(value).expect("Failed to compute ihash of value")
}

/// Compute the reduce bucket for a key, in `[0, n_reducers)`.
///
/// Every shuffle responder in a job must route through this same function so
/// that the reducer buckets form a true, non-overlapping cover of the key
/// space.
pub fn reducer_for(key: &str, n_reducers: u32) -> u32 {
    debug_assert!(n_reducers > 0);
    ihash(key.as_bytes()) % n_reducers
}

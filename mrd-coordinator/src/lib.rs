//! The coordinator of the map/reduce cluster.
//!
//! Accepts a job from a client, drives the map phase across the worker
//! roster, then the reduce phase, retrying each phase with a shrinking
//! roster as workers fail, and reports the final output locations back to
//! the client.

pub mod args;
pub mod core;
pub mod jobs;

//! A worker process of the map/reduce cluster.
//!
//! The worker listens for remote commands, executes each one against the
//! connection it arrived on, and keeps this machine's share of the
//! intermediate and final stores.

pub mod args;
pub mod core;
pub mod map;
pub mod reduce;
pub mod shuffle;

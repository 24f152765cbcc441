use std::path::PathBuf;

use clap::Parser;

use common::protocol::DEFAULT_COMMAND_TIMEOUT_SECS;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The port to listen on for client job submissions.
    #[arg(short, long, default_value = "8030")]
    pub port: u16,

    /// Path to the worker roster (JSON array of worker descriptors).
    #[arg(short, long, default_value = "workers.json")]
    pub workers: PathBuf,

    /// Timeout, in seconds, for each remote command exchange.
    #[arg(short, long, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
    pub timeout: u64,
}

use std::path::PathBuf;

use clap::Parser;

use common::protocol::DEFAULT_COMMAND_TIMEOUT_SECS;
use common::store::STORAGE_ROOT;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// This worker's name; keys its on-disk stores and must match the
    /// coordinator's roster entry.
    #[arg(short, long)]
    pub name: String,

    /// The port to listen on for remote commands.
    #[arg(short, long)]
    pub port: u16,

    /// Root directory of this worker's storage.
    #[arg(short, long, default_value = STORAGE_ROOT)]
    pub storage: PathBuf,

    /// Timeout, in seconds, for shuffle requests issued to other workers.
    #[arg(short, long, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
    pub timeout: u64,
}

use clap::Parser;

mod args;
mod core;

use args::{Args, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Submit {
            address,
            map,
            reduce,
            args,
        } => core::submit(address, map, reduce, args).await,
    }
}

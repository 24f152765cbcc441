use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a job to the cluster and print where the output landed.
    Submit {
        /// Address of the coordinator, host:port.
        #[arg(short, long, default_value = "127.0.0.1:8030")]
        address: String,

        /// Name of the workload whose map function to run.
        #[arg(short, long)]
        map: String,

        /// Name of the workload whose reduce function to run; defaults to
        /// the map workload.
        #[arg(short, long)]
        reduce: Option<String>,

        /// Auxiliary arguments to pass to the MapReduce application.
        #[clap(value_parser, last = true)]
        args: Vec<String>,
    },
}

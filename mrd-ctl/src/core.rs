use anyhow::bail;
use tokio::net::TcpStream;

use common::codec;
use common::protocol::{JobReply, JobRequest, TaskSpec};

/// Submit a job to the coordinator and print the result locations.
pub async fn submit(
    address: String,
    map: String,
    reduce: Option<String>,
    aux: Vec<String>,
) -> anyhow::Result<()> {
    let request = JobRequest {
        map: TaskSpec {
            workload: map.clone(),
            aux: aux.clone(),
        },
        reduce: TaskSpec {
            workload: reduce.unwrap_or(map),
            aux,
        },
    };

    let stream = TcpStream::connect(&address).await?;
    let mut frames = codec::frames(stream);
    codec::send_message(&mut frames, &request).await?;
    let reply: JobReply = codec::recv_message(&mut frames).await?;

    match reply {
        JobReply::Completed(result) => {
            println!("Results found at:");
            for location in &result.outputs {
                println!("{}", location);
            }
            Ok(())
        }
        JobReply::Failed { reason } => bail!("job failed: {reason}"),
    }
}

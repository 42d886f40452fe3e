use std::process::ExitCode;

use anyhow::Result;
use argp::FromArgs;
use gitpulse_jobs::{JobContext, RunStatus, process_metrics_job};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Run the metrics job for one installation now.
#[argp(subcommand, name = "run")]
pub struct Args {
    #[argp(positional)]
    /// installation id of the organization
    installation_id: u64,
}

pub async fn run(ctx: &JobContext, args: Args) -> Result<ExitCode> {
    let status = process_metrics_job(ctx, args.installation_id).await;
    println!("{}", status.as_str());
    Ok(if status == RunStatus::Error { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

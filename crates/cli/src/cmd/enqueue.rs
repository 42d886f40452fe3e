use std::process::ExitCode;

use anyhow::Result;
use argp::FromArgs;
use gitpulse_jobs::{JobContext, enqueue_now};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Make an installation's metrics job due on the next dispatch, releasing any
/// claim left by an interrupted run.
#[argp(subcommand, name = "enqueue")]
pub struct Args {
    #[argp(positional)]
    /// installation id of the organization
    installation_id: u64,
}

pub async fn run(ctx: &JobContext, args: Args) -> Result<ExitCode> {
    enqueue_now(ctx, args.installation_id).await?;
    Ok(ExitCode::SUCCESS)
}

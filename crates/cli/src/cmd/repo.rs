use std::process::ExitCode;

use anyhow::Result;
use argp::FromArgs;
use gitpulse_db::Database;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Onboard, enable or disable a repository.
#[argp(subcommand, name = "repo")]
pub struct Args {
    #[argp(positional)]
    /// repository id
    repo_id: u64,
    #[argp(switch)]
    /// exclude the repository from metrics runs
    disable: bool,
}

pub async fn run(db: &Database, args: Args) -> Result<ExitCode> {
    db.set_repository_flags(args.repo_id, true, !args.disable).await?;
    tracing::info!(
        "Repository {} {}",
        args.repo_id,
        if args.disable { "disabled" } else { "onboarded and enabled" }
    );
    Ok(ExitCode::SUCCESS)
}

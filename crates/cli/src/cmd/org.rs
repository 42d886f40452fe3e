use std::process::ExitCode;

use anyhow::Result;
use argp::FromArgs;
use gitpulse_core::models::{OrgStatus, Organization};
use gitpulse_db::Database;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Register or update an organization installation.
#[argp(subcommand, name = "org")]
pub struct Args {
    #[argp(positional)]
    /// installation id
    installation_id: u64,
    #[argp(positional)]
    /// organization login
    org_name: String,
    #[argp(option, short = 't')]
    /// access token used for API requests
    token: String,
    #[argp(option, default = "String::from(\"ACTIVE\")")]
    /// organization status
    status: String,
    #[argp(switch)]
    /// mark onboarding as incomplete
    pending: bool,
}

pub async fn run(db: &Database, args: Args) -> Result<ExitCode> {
    let org = Organization {
        installation_id: args.installation_id,
        org_name: args.org_name,
        token: args.token,
        status: args.status.parse::<OrgStatus>().unwrap_or_else(|e| match e {}),
        onboard_complete: !args.pending,
        api_limit_exceeded: false,
        api_limit_reached_count: 0,
    };
    db.upsert_org(&org).await?;
    tracing::info!("Registered {:?}", org);
    Ok(ExitCode::SUCCESS)
}

use std::process::ExitCode;

use anyhow::{Context, Result};
use argp::FromArgs;
use gitpulse_jobs::JobContext;
use tokio::signal;

use crate::cron;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Dispatch due metrics jobs on the configured schedule until interrupted.
#[argp(subcommand, name = "serve")]
pub struct Args {}

pub async fn run(ctx: &JobContext, _args: Args) -> Result<ExitCode> {
    let mut scheduler = cron::create(ctx.clone()).await.context("Failed to create scheduler")?;
    let scheduler_config = &ctx.config.scheduler;
    tracing::info!("Dispatching {} jobs {}", scheduler_config.task, scheduler_config.schedule);
    shutdown_signal().await.context("Failed to listen for shutdown signal")?;
    scheduler.shutdown().await.context("Failed to shut down scheduler")?;
    tracing::info!("Shut down gracefully");
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await
    }
}

mod cmd;
mod cron;

use std::{fs::File, io::BufReader, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use argp::FromArgs;
use gitpulse_core::config::Config;
use gitpulse_db::Database;
use gitpulse_github::GitHub;
use gitpulse_jobs::JobContext;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(FromArgs, PartialEq, Debug)]
/// Collect GitHub repository metrics into a local database.
struct TopLevel {
    #[argp(option, short = 'c', default = "PathBuf::from(\"config.yml\")")]
    /// path to the configuration file
    config: PathBuf,
    #[argp(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Run(cmd::run::Args),
    Serve(cmd::serve::Args),
    Enqueue(cmd::enqueue::Args),
    Org(cmd::org::Args),
    Repo(cmd::repo::Args),
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: TopLevel) -> Result<ExitCode> {
    let config: Arc<Config> = {
        let file = BufReader::new(
            File::open(&args.config)
                .with_context(|| format!("Failed to open {}", args.config.display()))?,
        );
        serde_yaml::from_reader(file).context("Failed to parse config file")?
    };
    let db = Arc::new(Database::new(&config.db).await.context("Failed to open database")?);
    let github = GitHub::new(&config.github).context("Failed to create GitHub client")?;
    let ctx = JobContext::new(config, db.clone(), github);

    let result = match args.command {
        SubCommand::Run(c) => cmd::run::run(&ctx, c).await,
        SubCommand::Serve(c) => cmd::serve::run(&ctx, c).await,
        SubCommand::Enqueue(c) => cmd::enqueue::run(&ctx, c).await,
        SubCommand::Org(c) => cmd::org::run(&db, c).await,
        SubCommand::Repo(c) => cmd::repo::run(&db, c).await,
    };
    db.close().await;
    result
}

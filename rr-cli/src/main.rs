//! RiverRunner CLI - ingest river and weather data, forecast flow, and score runs.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "riverrunner",
    version,
    about = "Whitewater flow forecasting toolkit"
)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "RIVERRUNNER_DB", default_value = "riverrunner.sqlite", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: rr_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    log::debug!("Using database {}", cli.db.display());
    rr_cmd::run(&cli.db, cli.command).await
}

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;
mod profiles;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.logging_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args, &config).await,
        Commands::Prompt(args) => commands::prompt::run(args),
        Commands::Backup(cmd) => commands::backup::run(cmd, &config),
        Commands::Config(cmd) => commands::settings::run(cmd, &config, cli.config.as_deref())
    }
}

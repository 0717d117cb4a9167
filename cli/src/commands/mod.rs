pub mod backup;
pub mod generate;
pub mod prompt;
pub mod settings;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "portraits",
    author,
    version,
    about = "Portraits - AI profile portrait generation",
    long_about = "Generates profile portraits through an images API with client-side rate \
                  limiting, retries and a filesystem cache.\n\nConfiguration is read from \
                  defaults, an optional TOML/YAML file and environment variables, in that order."
)]
pub struct Cli {
    #[arg(long, global = true, env = "PORTRAITS_CONFIG", help = "Configuration file (.toml, .yaml)")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generate portraits for a profiles file")]
    Generate(generate::GenerateArgs),

    #[command(about = "Print generation prompts without calling the provider")]
    Prompt(prompt::PromptArgs),

    #[command(subcommand, about = "Create, list and restore image backups")]
    Backup(backup::BackupCommand),

    #[command(subcommand, about = "Inspect the effective configuration")]
    Config(settings::ConfigCommand)
}

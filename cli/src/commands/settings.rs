use crate::output;
use anyhow::Result;
use clap::Subcommand;
use config::Config;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Print the effective configuration with secrets redacted")]
    Show {
        #[arg(long, help = "Output as JSON")]
        json: bool
    },

    #[command(about = "Validate the effective configuration")]
    Validate
}

pub fn run(cmd: ConfigCommand, config: &Config, source: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let mut shown = config.clone();
            shown.provider = config.provider.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("{}", toml::to_string_pretty(&shown)?);
            }
        }
        ConfigCommand::Validate => {
            config::validate(config)?;
            let origin = source.map_or_else(|| "defaults and environment".to_string(), |p| p.display().to_string());
            output::success(&format!("Configuration is valid ({origin})"));
            if config.provider.api_key.is_empty() {
                output::warn("No provider API key set; generation will fail");
            }
        }
    }
    Ok(())
}

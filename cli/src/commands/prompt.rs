use crate::profiles;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use generation::build_prompt;
use std::path::PathBuf;

#[derive(Args)]
pub struct PromptArgs {
    #[arg(long, help = "JSON array of profile records")]
    pub profiles: PathBuf,

    #[arg(long = "only", value_name = "ID", help = "Only print prompts for these profile ids")]
    pub only: Vec<String>
}

pub fn run(args: PromptArgs) -> Result<()> {
    for identity in profiles::load(&args.profiles, &args.only)? {
        println!("{}", identity.id.bold());
        println!("{}", build_prompt(&identity));
        println!();
    }
    Ok(())
}

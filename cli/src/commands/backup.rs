use crate::output;
use anyhow::{Result, bail};
use clap::Subcommand;
use config::Config;
use portrait_backup::BackupManager;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum BackupCommand {
    #[command(about = "Snapshot the images directory")]
    Create {
        #[arg(long, help = "Directory to back up (defaults to generation.images_dir)")]
        source: Option<PathBuf>
    },

    #[command(about = "List snapshots, oldest first")]
    List,

    #[command(about = "Restore a snapshot into the images directory")]
    Restore {
        #[arg(long, help = "Snapshot name or path (defaults to the latest)")]
        from: Option<PathBuf>,

        #[arg(long, help = "Target directory (defaults to generation.images_dir)")]
        target: Option<PathBuf>,

        #[arg(long, help = "Replace files that already exist in the target")]
        overwrite: bool
    }
}

pub fn run(cmd: BackupCommand, config: &Config) -> Result<()> {
    let manager = BackupManager::new(&config.backup);

    match cmd {
        BackupCommand::Create { source } => {
            let source = source.unwrap_or_else(|| config.generation.images_dir.clone());
            let report = manager.create_backup(&source)?;
            output::success(&format!(
                "Backed up {} file(s) to {}",
                report.files_backed_up,
                report.snapshot.display()
            ));
            for pruned in &report.pruned {
                output::info(&format!("Pruned {}", pruned.display()));
            }
        }
        BackupCommand::List => {
            let snapshots = manager.list_backups()?;
            if snapshots.is_empty() {
                output::info(&format!("No snapshots in {}", manager.backup_root().display()));
            }
            for snapshot in snapshots {
                println!("{}", snapshot.display());
            }
        }
        BackupCommand::Restore { from, target, overwrite } => {
            let target = target.unwrap_or_else(|| config.generation.images_dir.clone());
            let restored = match (from, overwrite) {
                (None, false) => manager.restore_from_latest_backup(&target)?,
                (from, overwrite) => {
                    let snapshot = match from {
                        Some(from) if from.exists() => from,
                        Some(name) => manager.backup_root().join(name),
                        None => match manager.latest_backup()? {
                            Some(latest) => latest,
                            None => bail!("No snapshots in {}", manager.backup_root().display())
                        }
                    };
                    Some(manager.restore_images(&snapshot, &target, overwrite)?)
                }
            };

            match restored {
                Some(count) => output::success(&format!("Restored {count} file(s) into {}", target.display())),
                None => bail!("No snapshots in {}", manager.backup_root().display())
            }
        }
    }
    Ok(())
}

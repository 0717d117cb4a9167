use crate::{output, profiles};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use config::Config;
use generation::{BackupOutcome, BatchReport, GenerationOrchestrator};
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(long, help = "JSON array of profile records")]
    pub profiles: PathBuf,

    #[arg(long, help = "Images directory (defaults to generation.images_dir)")]
    pub images_dir: Option<PathBuf>,

    #[arg(long = "only", value_name = "ID", help = "Only generate these profile ids")]
    pub only: Vec<String>,

    #[arg(long, help = "Output as JSON")]
    pub json: bool
}

pub async fn run(args: GenerateArgs, config: &Config) -> Result<()> {
    let identities = profiles::load(&args.profiles, &args.only)?;
    let images_dir = args
        .images_dir
        .unwrap_or_else(|| config.generation.images_dir.clone());

    let orchestrator = GenerationOrchestrator::from_config(config)?;
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    if !args.json {
        output::info(&format!(
            "Generating {} portrait(s) into {}",
            identities.len(),
            images_dir.display()
        ));
    }
    let report = orchestrator.generate_for_all(&identities, &images_dir).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&report))?);
    } else {
        print_summary(&report);
    }

    if report.failed() > 0 {
        bail!("{} of {} profile(s) failed", report.failed(), report.total());
    }
    Ok(())
}

fn summary_json(report: &BatchReport) -> serde_json::Value {
    let outcomes: Vec<_> = report
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(image) => serde_json::json!({
                "profile_id": outcome.profile_id,
                "status": outcome.status(),
                "bytes": image.bytes.len()
            }),
            Err(error) => serde_json::json!({
                "profile_id": outcome.profile_id,
                "status": outcome.status(),
                "error": error.to_string(),
                "error_kind": error.kind(),
                "failure_class": error.class()
            })
        })
        .collect();

    let backup = report.backup.as_ref().map(|backup| match backup {
        BackupOutcome::Created { snapshot, files } => serde_json::json!({
            "snapshot": snapshot.display().to_string(),
            "files": files
        }),
        BackupOutcome::Failed { reason } => serde_json::json!({ "error": reason })
    });

    serde_json::json!({
        "started_at": report.started_at.to_rfc3339(),
        "completed_at": report.completed_at.map(|at| at.to_rfc3339()),
        "total": report.total(),
        "generated": report.generated(),
        "cached": report.cached(),
        "failed": report.failed(),
        "outcomes": outcomes,
        "backup": backup
    })
}

fn print_summary(report: &BatchReport) {
    output::header("Portrait generation");
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(_) => println!("  {} {} ({})", "✓".green(), outcome.profile_id, outcome.status()),
            Err(error) => output::error(&format!("{}: {}", outcome.profile_id, error))
        }
    }
    println!();
    println!(
        "{} generated, {} cached, {} failed",
        report.generated(),
        report.cached(),
        report.failed()
    );

    match &report.backup {
        Some(BackupOutcome::Created { snapshot, files }) => {
            output::success(&format!("Backed up {files} file(s) to {}", snapshot.display()));
        }
        Some(BackupOutcome::Failed { reason }) => output::warn(&format!("Backup failed: {reason}")),
        None => {}
    }
}

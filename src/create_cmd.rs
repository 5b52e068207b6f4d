//! Create command implementation

use anyhow::{Context, Result};
use std::path::PathBuf;

use foldex::create::apply_plan;
use foldex::output::{generate_execution_id, output_json, CreateResponse, JsonResponse};
use foldex::{
    materialize, CreateOutcome, Extension, MaterializeReport, OpenPlan, OutputFormat, Settings,
    SettingsStore,
};

use crate::terminal::{TerminalNotifier, TerminalOpener, TerminalPrompt};

/// Returns the process exit code: 1 if any target failed.
pub async fn run_create(
    root: PathBuf,
    settings: Settings,
    dest: String,
    input: Option<String>,
    output_format: OutputFormat,
) -> Result<u8> {
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("Failed to resolve root {}", root.display()))?;

    let (report, plan) = match input {
        Some(input) => {
            let report = materialize(&root, &dest, &input).await?;
            let plan = OpenPlan::for_report(&report, settings.open_policy());
            if output_format == OutputFormat::Human {
                apply_plan(&plan, &TerminalOpener);
            }
            (report, plan)
        }
        None => {
            let extension = Extension::new(SettingsStore::new(settings)).without_watcher();
            let session = extension.activate(&root).await?;

            let outcome = foldex::run_create(
                &extension,
                Some(&session),
                &TerminalPrompt,
                &TerminalNotifier,
                &TerminalOpener,
            )
            .await;
            extension.deactivate(session).await;

            match outcome? {
                CreateOutcome::Created { report, plan } => (report, plan),
                CreateOutcome::Cancelled | CreateOutcome::NoWorkspace => return Ok(0),
            }
        }
    };

    print_report(&report, &plan, output_format)?;

    Ok(if report.failures.is_empty() { 0 } else { 1 })
}

fn print_report(report: &MaterializeReport, plan: &OpenPlan, output_format: OutputFormat) -> Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = JsonResponse::new(CreateResponse::new(report, plan), &generate_execution_id());
            output_json(&response)?;
        }
        OutputFormat::Human => {
            for created in &report.created {
                println!("CREATED {}", created.path.display());
            }
            for failure in &report.failures {
                eprintln!("FAILED {}: {}", failure.target, failure.error);
            }
        }
    }
    Ok(())
}

//! Index command implementation

use anyhow::{Context, Result};
use std::path::PathBuf;

use foldex::output::{generate_execution_id, output_json, IndexResponse, JsonResponse};
use foldex::{ExternalEnumerator, FolderIndexCache, IndexStrategy, OutputFormat, RuleCompiler, Settings};

pub async fn run_index(
    root: PathBuf,
    settings: Settings,
    external: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("Failed to resolve root {}", root.display()))?;

    let strategy = if external {
        IndexStrategy::External(ExternalEnumerator::new())
    } else {
        IndexStrategy::Walk
    };

    let compiler = RuleCompiler::new();
    let rules = settings.rules(&compiler);
    let options = settings.walk_options();

    let cache = FolderIndexCache::new(&root, strategy);
    let index = cache.rebuild(&root, &rules, &options).await?;

    match output_format {
        OutputFormat::Json => {
            let response = JsonResponse::new(IndexResponse::from(index.as_ref()), &generate_execution_id());
            output_json(&response)?;
        }
        OutputFormat::Human => {
            for entry in &index.entries {
                println!("{}", entry);
            }
            for diagnostic in index.diagnostics.iter().filter(|d| d.is_error()) {
                eprintln!("{}", diagnostic.format_stderr());
            }
            eprintln!("{} directories under {}", index.len(), root.display());
        }
    }

    Ok(())
}

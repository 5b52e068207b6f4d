//! JSON output for CLI commands.
//!
//! Every JSON response is wrapped in a [`JsonResponse`] carrying a schema
//! version and a per-run execution id.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diagnostics::WalkDiagnostic;
use crate::index::{DirectoryEntry, WorkspaceIndex};
use crate::materialize::{Created, MaterializeReport, OpenPlan};

/// Bumped whenever a response shape changes incompatibly.
pub const JSON_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    pub schema_version: String,
    pub execution_id: String,
    pub tool: String,
    /// RFC 3339, seconds precision
    pub timestamp: String,
    pub data: T,
}

impl<T> JsonResponse<T> {
    pub fn new(data: T, execution_id: &str) -> Self {
        JsonResponse {
            schema_version: JSON_SCHEMA_VERSION.to_string(),
            execution_id: execution_id.to_string(),
            tool: "foldex".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            data,
        }
    }
}

/// `foldex index` response body.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub root: PathBuf,
    pub built_at: String,
    pub count: usize,
    pub entries: Vec<DirectoryEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<WalkDiagnostic>,
}

impl From<&WorkspaceIndex> for IndexResponse {
    fn from(index: &WorkspaceIndex) -> Self {
        Self {
            root: index.root.clone(),
            built_at: index.built_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            count: index.entries.len(),
            entries: index.entries.clone(),
            diagnostics: index.diagnostics.clone(),
        }
    }
}

/// `foldex create` response body.
#[derive(Debug, Serialize)]
pub struct CreateResponse<'a> {
    pub created: &'a [Created],
    pub failures: &'a [crate::materialize::TargetFailure],
    pub open: &'a [PathBuf],
    pub focus: Option<&'a PathBuf>,
}

impl<'a> CreateResponse<'a> {
    pub fn new(report: &'a MaterializeReport, plan: &'a OpenPlan) -> Self {
        Self {
            created: &report.created,
            failures: &report.failures,
            open: &plan.open,
            focus: plan.focus.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl OutputFormat {
    /// Parse from a `--output` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Some(OutputFormat::Human),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Unique id for one CLI run.
pub fn generate_execution_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Print pretty JSON to stdout.
pub fn output_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn test_execution_ids_differ() {
        assert_ne!(generate_execution_id(), generate_execution_id());
    }

    #[test]
    fn test_envelope_fields() {
        let response = JsonResponse::new(vec!["/src"], "abc");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["schema_version"], JSON_SCHEMA_VERSION);
        assert_eq!(value["tool"], "foldex");
        assert_eq!(value["data"][0], "/src");
    }
}

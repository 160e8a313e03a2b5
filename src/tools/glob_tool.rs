//! glob - list workspace files matching a pattern

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, object_schema, parse_args};
use crate::llm::ToolDefinition;

const MAX_MATCHES: usize = 1000;

#[derive(Deserialize)]
struct Args {
    pattern: String,
    #[serde(default = "workspace_root")]
    path: String,
}

fn workspace_root() -> String {
    ".".to_string()
}

pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "glob",
            "List files matching a glob pattern such as **/*.rs, sorted, relative to the workspace root.",
            object_schema(
                &[
                    ("pattern", "string", "Glob pattern"),
                    ("path", "string", "Directory to search from (default: workspace root)"),
                ],
                &["pattern"],
            ),
        )
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Args { pattern, path } = parse_args(input)?;
        if pattern.starts_with('/') || pattern.split('/').any(|segment| segment == "..") {
            return Err(ToolError::InvalidInput(format!(
                "pattern must stay inside the workspace: {}",
                pattern
            )));
        }

        let base = ctx.resolve(&path)?;
        let full = base.join(&pattern);
        let entries = glob::glob(&full.to_string_lossy())
            .map_err(|e| ToolError::InvalidInput(format!("bad pattern {}: {}", pattern, e)))?;

        let mut found: Vec<String> = entries
            .flatten()
            .filter(|hit| hit.starts_with(ctx.root()))
            .map(|hit| ctx.relative(&hit))
            .collect();
        found.sort();

        let total = found.len();
        found.truncate(MAX_MATCHES);
        match total {
            0 => Ok(format!("No files match {}", pattern)),
            n if n > MAX_MATCHES => Ok(format!("{}\n[{} more not shown]", found.join("\n"), n - MAX_MATCHES)),
            _ => Ok(found.join("\n")),
        }
    }
}

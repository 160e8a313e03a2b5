//! read_file - numbered file contents, also the prerequisite for apply_edits

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, object_schema, parse_args};
use crate::llm::ToolDefinition;

const DEFAULT_LIMIT: usize = 2000;
const MAX_LINE_CHARS: usize = 2000;

#[derive(Deserialize)]
struct Args {
    path: String,
    #[serde(default = "first_line")]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn first_line() -> usize {
    1
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "read_file",
            "Read a file with line numbers. Read a file before changing it with apply_edits.",
            object_schema(
                &[
                    ("path", "string", "File path relative to the workspace root"),
                    ("offset", "integer", "First line to show, 1-indexed (default 1)"),
                    ("limit", "integer", "Maximum number of lines (default 2000)"),
                ],
                &["path"],
            ),
        )
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: Args = parse_args(input)?;
        let file = ctx.resolve(&args.path)?;
        let text = tokio::fs::read_to_string(&file)
            .await
            .map_err(ToolError::io(format!("read {}", args.path)))?;
        ctx.mark_seen(&file).await;

        let start = args.offset.max(1);
        let numbered = numbered_lines(&text, start, args.limit);
        if numbered.is_empty() {
            return Ok(format!("{} has no lines from {}", args.path, start));
        }
        Ok(numbered)
    }
}

fn numbered_lines(text: &str, start: usize, limit: usize) -> String {
    let mut out = String::new();
    for (number, line) in text.lines().enumerate().skip(start - 1).take(limit) {
        if !out.is_empty() {
            out.push('\n');
        }
        let shown: String = line.chars().take(MAX_LINE_CHARS).collect();
        let ellipsis = if shown.len() < line.len() { "..." } else { "" };
        out.push_str(&format!("{:>6}|{}{}", number + 1, shown, ellipsis));
    }
    out
}

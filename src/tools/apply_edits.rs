//! apply_edits - replace line ranges of a file the model has already read

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolContext, ToolError, parse_args};
use crate::llm::ToolDefinition;

/// Lines `start_line..=end_line` (1-indexed) become `content`.
/// `end_line == start_line - 1` is a pure insertion before `start_line`.
#[derive(Debug, Clone, Deserialize)]
struct LineEdit {
    start_line: usize,
    end_line: usize,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Args {
    path: String,
    edits: Vec<LineEdit>,
}

pub struct ApplyEditsTool;

#[async_trait]
impl Tool for ApplyEditsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "apply_edits",
            "Replace line ranges in a file you have read with read_file. Line numbers refer to \
             the file as read; ranges must not overlap.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path relative to the workspace root"},
                    "edits": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "start_line": {"type": "integer", "description": "First replaced line, 1-indexed"},
                                "end_line": {"type": "integer", "description": "Last replaced line, inclusive; start_line - 1 inserts"},
                                "content": {"type": "string", "description": "Replacement lines"}
                            },
                            "required": ["start_line", "end_line", "content"]
                        }
                    }
                },
                "required": ["path", "edits"]
            }),
        )
    }

    fn mutates(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Args { path, edits } = parse_args(input)?;
        let file = ctx.resolve(&path)?;
        if !ctx.has_seen(&file).await {
            return Err(ToolError::NotRead { path });
        }

        let before = tokio::fs::read_to_string(&file)
            .await
            .map_err(ToolError::io(format!("read {}", path)))?;
        let count = edits.len();
        let after = splice_lines(&before, edits)?;
        tokio::fs::write(&file, &after)
            .await
            .map_err(ToolError::io(format!("write {}", path)))?;

        Ok(format!(
            "Applied {} edit(s) to {}, now {} lines",
            count,
            path,
            after.lines().count()
        ))
    }
}

fn splice_lines(text: &str, mut edits: Vec<LineEdit>) -> Result<String, ToolError> {
    if edits.is_empty() {
        return Err(ToolError::InvalidInput("edits must not be empty".to_string()));
    }

    let mut lines: Vec<&str> = text.lines().collect();
    let len = lines.len();
    edits.sort_by_key(|edit| edit.start_line);

    let mut covered_to = 0;
    for edit in &edits {
        let in_bounds = (1..=len + 1).contains(&edit.start_line)
            && edit.end_line.saturating_add(1) >= edit.start_line
            && edit.end_line <= len;
        if !in_bounds {
            return Err(ToolError::InvalidInput(format!(
                "lines {}-{} are outside a {}-line file",
                edit.start_line, edit.end_line, len
            )));
        }
        if edit.start_line <= covered_to {
            return Err(ToolError::InvalidInput(format!(
                "edit at line {} overlaps the edit before it",
                edit.start_line
            )));
        }
        covered_to = edit.end_line;
    }

    // Last edit first keeps the earlier line numbers valid
    for edit in edits.iter().rev() {
        lines.splice(edit.start_line - 1..edit.end_line, edit.content.lines());
    }

    let mut out = lines.join("\n");
    if text.is_empty() || text.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

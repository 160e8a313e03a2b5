//! make_dir - create a directory tree

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, object_schema, parse_args};
use crate::llm::ToolDefinition;

#[derive(Deserialize)]
struct Args {
    path: String,
}

pub struct MakeDirTool;

#[async_trait]
impl Tool for MakeDirTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "make_dir",
            "Create a directory and any missing parents. Existing directories are left alone.",
            object_schema(&[("path", "string", "Directory path relative to the workspace root")], &["path"]),
        )
    }

    fn mutates(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Args { path } = parse_args(input)?;
        let target = ctx.resolve(&path)?;
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(ToolError::io(format!("create {}", path)))?;
        Ok(format!("Directory {} exists", ctx.relative(&target)))
    }
}

//! stat_path - existence, kind, size and mtime of a path, as JSON

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, object_schema, parse_args};
use crate::llm::ToolDefinition;

#[derive(Deserialize)]
struct Args {
    path: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Kind {
    File,
    Dir,
    Symlink,
}

#[derive(Debug, Serialize, Deserialize)]
struct Stat {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<Kind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<DateTime<Utc>>,
}

pub struct StatPathTool;

#[async_trait]
impl Tool for StatPathTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "stat_path",
            "Describe a path: whether it exists, and if so its kind (file, dir, symlink), size and modification time.",
            object_schema(&[("path", "string", "Path relative to the workspace root")], &["path"]),
        )
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Args { path } = parse_args(input)?;
        let target = ctx.resolve(&path)?;

        let stat = match tokio::fs::symlink_metadata(&target).await {
            Ok(meta) => Stat {
                kind: Some(if meta.file_type().is_symlink() {
                    Kind::Symlink
                } else if meta.is_dir() {
                    Kind::Dir
                } else {
                    Kind::File
                }),
                size: Some(meta.len()),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                path,
                exists: true,
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Stat {
                path,
                exists: false,
                kind: None,
                size: None,
                modified: None,
            },
            Err(e) => return Err(ToolError::io(format!("stat {}", path))(e)),
        };

        serde_json::to_string(&stat).map_err(|e| ToolError::InvalidInput(e.to_string()))
    }
}

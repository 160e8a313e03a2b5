//! delete_path - remove a file or directory

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, object_schema, parse_args};
use crate::llm::ToolDefinition;

#[derive(Deserialize)]
struct Args {
    path: String,
    #[serde(default)]
    recursive: bool,
}

pub struct DeletePathTool;

#[async_trait]
impl Tool for DeletePathTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "delete_path",
            "Delete a file or directory. A non-empty directory needs recursive=true.",
            object_schema(
                &[
                    ("path", "string", "Path relative to the workspace root"),
                    ("recursive", "boolean", "Also remove everything under a directory (default false)"),
                ],
                &["path"],
            ),
        )
    }

    fn mutates(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Args { path, recursive } = parse_args(input)?;
        let target = ctx.resolve(&path)?;
        if target == ctx.root() {
            return Err(ToolError::InvalidInput("the workspace root cannot be deleted".to_string()));
        }

        let metadata = match tokio::fs::symlink_metadata(&target).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ToolError::Missing { path }),
            Err(e) => return Err(ToolError::io(format!("inspect {}", path))(e)),
        };

        if !metadata.is_dir() {
            tokio::fs::remove_file(&target)
                .await
                .map_err(ToolError::io(format!("delete {}", path)))?;
            return Ok(format!("Deleted {}", path));
        }

        let removal = if recursive {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_dir(&target).await
        };
        removal.map_err(ToolError::io(format!(
            "delete directory {}{}",
            path,
            if recursive { "" } else { " (non-empty needs recursive=true)" }
        )))?;
        Ok(format!("Deleted directory {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::WorkspaceLock;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_deletes_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stale.rs"), "").unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());

        let out = DeletePathTool.call(json!({"path": "stale.rs"}), &ctx).await.unwrap();

        assert_eq!(out, "Deleted stale.rs");
        assert!(!dir.path().join("stale.rs").exists());
    }

    #[tokio::test]
    async fn test_directory_needs_recursive_when_not_empty() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("old/inner")).unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());

        let err = DeletePathTool.call(json!({"path": "old"}), &ctx).await.unwrap_err();
        assert!(err.to_string().contains("recursive=true"));
        assert!(dir.path().join("old/inner").exists());

        DeletePathTool
            .call(json!({"path": "old", "recursive": true}), &ctx)
            .await
            .unwrap();
        assert!(!dir.path().join("old").exists());
    }

    #[tokio::test]
    async fn test_missing_and_root() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());

        let missing = DeletePathTool.call(json!({"path": "ghost"}), &ctx).await.unwrap_err();
        assert!(matches!(missing, ToolError::Missing { .. }));

        let root = DeletePathTool
            .call(json!({"path": ".", "recursive": true}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(root, ToolError::InvalidInput(_)));
        assert!(dir.path().exists());
    }
}

//! write_file - create or replace a whole file

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, object_schema, parse_args};
use crate::llm::ToolDefinition;

#[derive(Deserialize)]
struct Args {
    path: String,
    content: String,
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "write_file",
            "Create a file or replace its entire contents. Missing parent directories are created.",
            object_schema(
                &[
                    ("path", "string", "File path relative to the workspace root"),
                    ("content", "string", "The complete new contents"),
                ],
                &["path", "content"],
            ),
        )
    }

    fn mutates(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Args { path, content } = parse_args(input)?;
        let file = ctx.resolve(&path)?;

        if let Some(dir) = file.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(ToolError::io(format!("create parents of {}", path)))?;
        }
        tokio::fs::write(&file, &content)
            .await
            .map_err(ToolError::io(format!("write {}", path)))?;
        // The model knows exactly what is in the file now
        ctx.mark_seen(&file).await;

        Ok(format!("Wrote {} ({} lines)", path, content.lines().count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::WorkspaceLock;
    use serde_json::json;
    use std::path::Path;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_writes_nested_file() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());

        let out = WriteFileTool
            .call(json!({"path": "src/api/routes.rs", "content": "mod a;\nmod b;\n"}), &ctx)
            .await
            .unwrap();

        assert_eq!(out, "Wrote src/api/routes.rs (2 lines)");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/api/routes.rs")).unwrap(),
            "mod a;\nmod b;\n"
        );
        assert!(ctx.has_seen(Path::new("src/api/routes.rs")).await);
    }

    #[tokio::test]
    async fn test_replaces_existing() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("NOTES.md"), "draft").unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());

        WriteFileTool
            .call(json!({"path": "NOTES.md", "content": "final"}), &ctx)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("NOTES.md")).unwrap(), "final");
    }

    #[tokio::test]
    async fn test_bad_input_and_escape() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());

        let missing = WriteFileTool.call(json!({"path": "a.txt"}), &ctx).await.unwrap_err();
        assert!(matches!(missing, ToolError::InvalidInput(_)));

        let escape = WriteFileTool
            .call(json!({"path": "../escape.txt", "content": "x"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(escape, ToolError::OutsideWorkspace { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_refuses_to_write_through_dangling_symlink() {
        let outside = tempdir().unwrap();
        let dir = tempdir().unwrap();
        let target = outside.path().join("pwned.txt");
        std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());

        let err = WriteFileTool
            .call(json!({"path": "link", "content": "escaped"}), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Io { .. }));
        assert!(!target.exists());
    }
}

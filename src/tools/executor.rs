//! Tool executor - the catalogue a role may call, run under the workspace lock

use std::collections::BTreeMap;

use log::debug;

use super::{
    ApplyEditsTool, DeletePathTool, GlobTool, MakeDirTool, ReadFileTool, RunCommandTool, StatPathTool, Tool,
    ToolContext, ToolError, WriteFileTool,
};
use crate::llm::{ContentBlock, ToolCall, ToolDefinition};
use crate::loops::Role;

pub struct ToolExecutor {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    pub fn empty() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Every workspace tool
    pub fn standard() -> Self {
        Self::empty()
            .with(ReadFileTool)
            .with(GlobTool)
            .with(StatPathTool)
            .with(RunCommandTool)
            .with(WriteFileTool)
            .with(ApplyEditsTool)
            .with(MakeDirTool)
            .with(DeletePathTool)
    }

    /// The standard catalogue without tools that change the workspace
    pub fn read_only() -> Self {
        let mut executor = Self::standard();
        executor.tools.retain(|_, tool| !tool.mutates());
        executor
    }

    pub fn for_role(role: Role) -> Self {
        if role.mutates_workspace() { Self::standard() } else { Self::read_only() }
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.insert(tool.definition().name, Box::new(tool));
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Run one call inside the workspace lock.
    ///
    /// A tool the role does not have is reported like any other failure.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::InvalidInput(format!("Unknown tool: {}", call.name)))?;
        if tool.mutates() {
            ctx.deny_if_read_only(&call.name)?;
        }

        let input = call.input.clone();
        ctx.lock().run_exclusive(|| tool.call(input, ctx)).await
    }

    /// Run calls in order, answering each with a `tool_result` block
    pub async fn execute_all(&self, calls: &[ToolCall], ctx: &ToolContext) -> Vec<ContentBlock> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let block = match self.execute(call, ctx).await {
                Ok(output) => ContentBlock::tool_result(&call.id, output, false),
                Err(e) => {
                    debug!("{} failed: {}", call.name, e);
                    ContentBlock::tool_result(&call.id, e.to_string(), true)
                }
            };
            results.push(block);
        }
        results
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::WorkspaceLock;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;

    fn result_of(block: &ContentBlock) -> (&str, &str, bool) {
        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => (tool_use_id.as_str(), content.as_str(), *is_error),
            other => panic!("not a tool result: {:?}", other),
        }
    }

    #[test]
    fn test_catalogues_per_role() {
        assert_eq!(
            ToolExecutor::for_role(Role::Builder).names(),
            [
                "apply_edits",
                "delete_path",
                "glob",
                "make_dir",
                "read_file",
                "run_command",
                "stat_path",
                "write_file"
            ]
        );
        assert_eq!(
            ToolExecutor::for_role(Role::Verifier).names(),
            ["glob", "read_file", "run_command", "stat_path"]
        );
        assert!(ToolExecutor::for_role(Role::Refactorer).has("apply_edits"));
        assert!(ToolExecutor::empty().definitions().is_empty());
    }

    #[test]
    fn test_definitions_carry_schemas() {
        let defs = ToolExecutor::standard().definitions();
        let write = defs.iter().find(|d| d.name == "write_file").unwrap();
        assert_eq!(write.input_schema["required"], json!(["path", "content"]));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error_block() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new()).read_only();
        let calls = [ToolCall::new("c1", "write_file", json!({"path": "x", "content": "y"}))];

        let blocks = ToolExecutor::read_only().execute_all(&calls, &ctx).await;

        let (id, content, is_error) = result_of(&blocks[0]);
        assert_eq!(id, "c1");
        assert!(is_error);
        assert!(content.contains("Unknown tool"));
        assert!(!dir.path().join("x").exists());
    }

    #[tokio::test]
    async fn test_read_only_context_blocks_mutation_even_with_full_catalogue() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new()).read_only();
        let call = ToolCall::new("c1", "make_dir", json!({"path": "new"}));

        let err = ToolExecutor::standard().execute(&call, &ctx).await.unwrap_err();

        assert!(matches!(err, ToolError::ReadOnly { .. }));
        assert!(!dir.path().join("new").exists());
    }

    #[tokio::test]
    async fn test_results_follow_call_order() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path(), WorkspaceLock::new());
        let calls = [
            ToolCall::new("w", "write_file", json!({"path": "a.txt", "content": "Hello"})),
            ToolCall::new("r", "read_file", json!({"path": "a.txt"})),
            ToolCall::new("s", "read_file", json!({"path": "/etc/hostname"})),
        ];

        let blocks = ToolExecutor::standard().execute_all(&calls, &ctx).await;

        assert_eq!(blocks.len(), 3);
        assert_eq!(result_of(&blocks[0]).0, "w");
        let (id, content, is_error) = result_of(&blocks[1]);
        assert_eq!(id, "r");
        assert!(!is_error);
        assert!(content.contains("1|Hello"));
        let (_, content, is_error) = result_of(&blocks[2]);
        assert!(is_error);
        assert!(content.contains("escapes workspace"));
    }

    #[tokio::test]
    async fn test_execution_queues_behind_workspace_lock() {
        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::new();
        let ctx = ToolContext::new(dir.path(), lock.clone());
        let executor = ToolExecutor::standard();

        let (held_tx, held_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let holder = tokio::spawn(async move {
            lock.run_exclusive(|| async move {
                let _ = held_tx.send(());
                let _ = release_rx.await;
            })
            .await;
        });
        held_rx.await.unwrap();

        let call = ToolCall::new("c1", "write_file", json!({"path": "late.txt", "content": "x"}));
        let pending = executor.execute(&call, &ctx);
        tokio::pin!(pending);

        assert!(tokio::time::timeout(Duration::from_millis(50), &mut pending).await.is_err());
        assert!(!dir.path().join("late.txt").exists());

        release_tx.send(()).unwrap();
        pending.await.unwrap();
        assert!(dir.path().join("late.txt").exists());
        holder.await.unwrap();
    }
}

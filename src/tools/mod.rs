//! Workspace tools for role invocations
//!
//! Every tool resolves its paths through `ToolContext`, which keeps them inside
//! the workspace. The executor runs each call inside the workspace lock, and the
//! Verifier gets an executor without the mutating tools.

mod apply_edits;
mod context;
mod delete_path;
mod executor;
mod glob_tool;
mod make_dir;
mod read_file;
mod run_command;
mod stat_path;
mod write_file;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::llm::ToolDefinition;

pub use apply_edits::ApplyEditsTool;
pub use context::{CommandPolicy, ToolContext};
pub use delete_path::DeletePathTool;
pub use executor::ToolExecutor;
pub use glob_tool::GlobTool;
pub use make_dir::MakeDirTool;
pub use read_file::ReadFileTool;
pub use run_command::{RunCommandTool, check_command};
pub use stat_path::StatPathTool;
pub use write_file::WriteFileTool;

/// Something the model can call against the workspace.
///
/// `Ok` text goes back to the model as a normal tool result, `Err` as an error
/// result. Neither aborts the conversation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Refused in a read-only context
    fn mutates(&self) -> bool {
        false
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError>;
}

/// Why a tool call did not succeed
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Path {path} escapes workspace {root}")]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    #[error("{tool} is not available to a read-only role")]
    ReadOnly { tool: String },

    #[error("Command not allowed ({reason}): {command}")]
    CommandRefused { command: String, reason: String },

    #[error("Command exited with {code}\n{output}")]
    CommandFailed { code: i32, output: String },

    #[error("Command timed out after {timeout_ms}ms")]
    CommandTimeout { timeout_ms: u64 },

    #[error("Must read file before editing: {path}")]
    NotRead { path: String },

    #[error("{path} does not exist")]
    Missing { path: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{action} failed: {source}")]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Adapter for `map_err` on filesystem calls
    pub fn io(action: impl Into<String>) -> impl FnOnce(std::io::Error) -> ToolError {
        let action = action.into();
        move |source| ToolError::Io { action, source }
    }
}

/// Decode a tool's JSON input into its argument struct
pub(crate) fn parse_args<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

/// Object schema from `(name, type, description)` triples; `required` lists the mandatory names
pub(crate) fn object_schema(fields: &[(&str, &str, &str)], required: &[&str]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(name, kind, description)| (name.to_string(), json!({"type": kind, "description": description})))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

//! Per-invocation tool context: workspace root, lock, command policy and read tracking

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::ToolError;
use crate::config::ToolsConfig;
use crate::coordination::WorkspaceLock;

/// What `run_command` is allowed to execute
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    pub allow_unsafe: bool,
    pub allowed_programs: Vec<String>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::from(&ToolsConfig::default())
    }
}

impl From<&ToolsConfig> for CommandPolicy {
    fn from(config: &ToolsConfig) -> Self {
        Self {
            allow_unsafe: config.allow_unsafe_commands,
            allowed_programs: config.allowed_commands.clone(),
            timeout: Duration::from_millis(config.command_timeout_ms),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

#[derive(Clone)]
pub struct ToolContext {
    root: PathBuf,
    lock: WorkspaceLock,
    commands: CommandPolicy,
    read_only: bool,
    /// Files the model has seen, so `apply_edits` line numbers mean something
    seen: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ToolContext {
    pub fn new(root: impl Into<PathBuf>, lock: WorkspaceLock) -> Self {
        let root = root.into();
        Self {
            root: root.canonicalize().unwrap_or(root),
            lock,
            commands: CommandPolicy::default(),
            read_only: false,
            seen: Arc::default(),
        }
    }

    /// Same workspace, but mutating tools refuse to run
    pub fn read_only(self) -> Self {
        Self { read_only: true, ..self }
    }

    pub fn with_commands(self, commands: CommandPolicy) -> Self {
        Self { commands, ..self }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock(&self) -> &WorkspaceLock {
        &self.lock
    }

    pub fn commands(&self) -> &CommandPolicy {
        &self.commands
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn deny_if_read_only(&self, tool: &str) -> Result<(), ToolError> {
        if self.read_only {
            return Err(ToolError::ReadOnly { tool: tool.to_string() });
        }
        Ok(())
    }

    pub async fn mark_seen(&self, path: &Path) {
        self.seen.lock().await.insert(self.root.join(path));
    }

    pub async fn has_seen(&self, path: &Path) -> bool {
        self.seen.lock().await.contains(&self.root.join(path))
    }

    /// Map a model-supplied path to an absolute path inside the workspace.
    ///
    /// `..` is collapsed lexically, then the deepest existing ancestor is
    /// canonicalized so a symlink cannot point outside either.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        let outside = || ToolError::OutsideWorkspace {
            path: PathBuf::from(requested),
            root: self.root.clone(),
        };

        let joined = collapse_dots(&self.root.join(requested));
        if !joined.starts_with(&self.root) {
            return Err(outside());
        }

        let real = canonicalize_existing(&joined).map_err(ToolError::io(format!("resolve {}", requested)))?;
        if real.starts_with(&self.root) { Ok(real) } else { Err(outside()) }
    }

    /// Workspace-relative form of `path`, for messages back to the model
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root).unwrap_or(path).display().to_string()
    }
}

fn collapse_dots(path: &Path) -> PathBuf {
    path.components().fold(PathBuf::new(), |mut out, component| {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
        out
    })
}

/// Canonicalize the deepest ancestor that is present on disk and re-append
/// the rest. A dangling symlink counts as present and is refused.
fn canonicalize_existing(path: &Path) -> std::io::Result<PathBuf> {
    let mut base = path;
    let mut tail = Vec::new();
    while let Err(e) = base.symlink_metadata() {
        if e.kind() != ErrorKind::NotFound {
            return Err(e);
        }
        match (base.file_name(), base.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name);
                base = parent;
            }
            _ => break,
        }
    }

    let mut real = match base.canonicalize() {
        Ok(real) => real,
        Err(_) if base.is_symlink() => {
            return Err(std::io::Error::new(
                ErrorKind::NotFound,
                format!("{} is a dangling symlink", base.display()),
            ));
        }
        Err(e) => return Err(e),
    };
    real.extend(tail.iter().rev());
    Ok(real)
}

//! run_command - run a build/test command in the workspace root

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;

use super::{CommandPolicy, Tool, ToolContext, ToolError, object_schema, parse_args};
use crate::llm::ToolDefinition;

/// Refused unless unsafe commands are allowed: chaining, pipes, redirection, substitution, backgrounding
const SHELL_OPERATORS: &[&str] = &["&&", "||", ";", "|", ">", "<", "`", "$(", "&", "\n", "\r"];

#[derive(Deserialize)]
struct Args {
    command: String,
    timeout_ms: Option<u64>,
}

/// Vet `command` against `policy` without running it
pub fn check_command(command: &str, policy: &CommandPolicy) -> Result<(), ToolError> {
    let command = command.trim();
    let refuse = |reason: String| ToolError::CommandRefused {
        command: command.to_string(),
        reason,
    };

    let Some(program) = command.split_whitespace().next() else {
        return Err(ToolError::InvalidInput("command is empty".to_string()));
    };
    if policy.allow_unsafe {
        return Ok(());
    }
    if let Some(op) = SHELL_OPERATORS.iter().find(|op| command.contains(*op)) {
        return Err(refuse(format!("shell operator `{}`", op.escape_debug())));
    }
    if !policy.allowed_programs.iter().any(|allowed| allowed == program) {
        return Err(refuse(format!("`{}` is not on the allow-list", program)));
    }
    Ok(())
}

/// Keep at most `max_bytes` of `text`, cut on a char boundary
fn clip(text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let cut = (0..=max_bytes).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    format!("{}...\n[clipped, {} bytes in full]", &text[..cut], text.len())
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    let out = String::from_utf8_lossy(stdout);
    let err = String::from_utf8_lossy(stderr);
    match (out.trim().is_empty(), err.trim().is_empty()) {
        (_, true) => out.into_owned(),
        (true, false) => err.into_owned(),
        (false, false) => format!("{}\n[stderr]\n{}", out, err),
    }
}

pub struct RunCommandTool;

#[async_trait]
impl Tool for RunCommandTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "run_command",
            "Run a single command in the workspace root, e.g. to build or run tests. Only allow-listed \
             programs; no pipes, redirection or chaining.",
            object_schema(
                &[
                    ("command", "string", "Command line to run"),
                    ("timeout_ms", "integer", "Timeout in milliseconds (default from configuration)"),
                ],
                &["command"],
            ),
        )
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: Args = parse_args(input)?;
        let policy = ctx.commands();
        check_command(&args.command, policy)?;
        let limit = args
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(policy.timeout);

        log::debug!("run_command in {}: {}", ctx.root().display(), args.command);
        let child = Command::new("sh")
            .arg("-c")
            .arg(&args.command)
            .current_dir(ctx.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(limit, child)
            .await
            .map_err(|_| ToolError::CommandTimeout {
                timeout_ms: limit.as_millis() as u64,
            })?
            .map_err(ToolError::io(format!("spawn {}", args.command)))?;

        let text = clip(combine(&output.stdout, &output.stderr), policy.max_output_bytes);
        if output.status.success() {
            Ok(text)
        } else {
            Err(ToolError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                output: text,
            })
        }
    }
}

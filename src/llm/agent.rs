//! Agent invoker - drives one role's model/tool conversation to completion
//!
//! Each invocation starts from a fresh conversation: the rendered role prompt
//! as the only user message. The model may call tools any number of times
//! within `max_turns`; the text of its final turn is the role's output.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};

use super::client::LlmClient;
use super::types::{CompletionRequest, Message, Usage};
use crate::config::Config;
use crate::coordination::WorkspaceLock;
use crate::error::{Result, TriloopError};
use crate::loops::{Role, RoleInvoker};
use crate::prompt::templates::SYSTEM_PROMPT;
use crate::tools::{CommandPolicy, ToolContext, ToolExecutor};

/// `RoleInvoker` backed by an `LlmClient` and the workspace tools
pub struct AgentInvoker<L: LlmClient> {
    client: Arc<L>,
    workspace: PathBuf,
    lock: WorkspaceLock,
    commands: CommandPolicy,
    max_turns: u32,
    max_tokens: u32,
}

impl<L: LlmClient> AgentInvoker<L> {
    pub fn new(client: Arc<L>, workspace: impl Into<PathBuf>, lock: WorkspaceLock) -> Self {
        Self {
            client,
            workspace: workspace.into(),
            lock,
            commands: CommandPolicy::default(),
            max_turns: 40,
            max_tokens: 8192,
        }
    }

    /// Take turn budget, token limit and command policy from `config`
    pub fn with_config(mut self, config: &Config) -> Self {
        self.commands = CommandPolicy::from(&config.tools);
        self.max_turns = config.coordination.max_turns;
        self.max_tokens = config.llm.max_tokens;
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    fn tool_context(&self, role: Role) -> ToolContext {
        let ctx = ToolContext::new(&self.workspace, self.lock.clone()).with_commands(self.commands.clone());
        if role.mutates_workspace() { ctx } else { ctx.read_only() }
    }
}

#[async_trait]
impl<L: LlmClient + 'static> RoleInvoker for AgentInvoker<L> {
    async fn invoke(&self, role: Role, prompt: &str) -> Result<String> {
        let executor = ToolExecutor::for_role(role);
        let ctx = self.tool_context(role);
        let tools = executor.definitions();
        let mut messages = vec![Message::user(prompt)];
        let mut usage = Usage::default();

        for turn in 1..=self.max_turns {
            let request = CompletionRequest::new(SYSTEM_PROMPT)
                .with_messages(messages.clone())
                .with_tools(tools.clone())
                .with_max_tokens(self.max_tokens);

            let response = self.client.complete(request).await?;
            usage += response.usage;

            let calls = response.tool_calls();
            if !response.stop_reason.needs_continuation() || calls.is_empty() {
                info!(
                    "{} finished after {} turn(s), {} tokens",
                    role,
                    turn,
                    usage.total()
                );
                return Ok(response.text_content());
            }

            debug!("{} turn {}: {} tool call(s)", role, turn, calls.len());
            messages.push(Message::assistant(response.content));

            let results = executor.execute_all(&calls, &ctx).await;
            messages.push(Message::tool_results(results));
        }

        Err(TriloopError::Llm(format!(
            "{} exhausted its budget of {} turns",
            role, self.max_turns
        )))
    }
}

//! Role loops for Triloop.
//!
//! Three independently paced loops share one workspace and one coordination record:
//! - `builder`: continuous passes toward the goal, bounded by `max_iterations`
//! - `verifier`: interval-based independent checks that set the verdict
//! - `refactorer`: trigger-based structural passes, never while verification passes
//!
//! ```text
//!  Idle → Invoking → Updating → Waiting ─┐
//!    ▲                                   │
//!    └───────────────────────────────────┘   (Termination → Done)
//! ```

pub mod builder;
pub mod refactorer;
pub mod verifier;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::coordination::{RefactorSignal, RefactorTrigger, Termination};
use crate::error::Result;
use crate::prompt::RolePrompts;
use crate::report::{BUILDER_TAG, REFACTORER_TAG, VERIFIER_TAG};
use crate::state::StateHandle;

/// One of the three autonomous roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Builder,
    Verifier,
    Refactorer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Builder, Role::Verifier, Role::Refactorer];

    /// Lowercase name, used for template names and logs
    pub fn name(&self) -> &'static str {
        match self {
            Role::Builder => "builder",
            Role::Verifier => "verifier",
            Role::Refactorer => "refactorer",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Role::Builder => "Builder",
            Role::Verifier => "Verifier",
            Role::Refactorer => "Refactorer",
        }
    }

    /// Report block tag this role ends its output with
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Builder => BUILDER_TAG,
            Role::Verifier => VERIFIER_TAG,
            Role::Refactorer => REFACTORER_TAG,
        }
    }

    /// The Verifier only observes
    pub fn mutates_workspace(&self) -> bool {
        !matches!(self, Role::Verifier)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a loop is in its cycle, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Invoking,
    Updating,
    Waiting,
    Done,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopPhase::Idle => "idle",
            LoopPhase::Invoking => "invoking",
            LoopPhase::Updating => "updating",
            LoopPhase::Waiting => "waiting",
            LoopPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// This loop observed the completion condition and raised termination
    Complete,
    /// Builder ran out of iterations
    Exhausted,
    /// Termination was raised elsewhere
    Terminated,
}

/// Runs one role against the workspace and returns its full output text
#[async_trait]
pub trait RoleInvoker: Send + Sync {
    async fn invoke(&self, role: Role, prompt: &str) -> Result<String>;
}

/// Everything a role loop needs, shared by all three
#[derive(Clone)]
pub struct LoopContext {
    pub state: StateHandle,
    pub trigger: RefactorTrigger,
    pub termination: Termination,
    pub config: Arc<Config>,
    pub invoker: Arc<dyn RoleInvoker>,
    pub prompts: Arc<RolePrompts>,
    pub signal: Arc<dyn RefactorSignal>,
}

pub(crate) fn enter(role: Role, phase: LoopPhase) {
    log::debug!("{} loop: {}", role, phase);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted invoker shared by the loop tests

    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    use tokio::sync::Mutex;

    use super::*;
    use crate::coordination::KeywordSignal;
    use crate::error::TriloopError;
    use crate::state::StateStore;

    #[derive(Default)]
    pub struct ScriptedInvoker {
        outputs: Mutex<HashMap<Role, VecDeque<Result<String>>>>,
        delays: HashMap<Role, Duration>,
        pub calls: Mutex<Vec<Role>>,
    }

    impl ScriptedInvoker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_delay(mut self, role: Role, delay: Duration) -> Self {
            self.delays.insert(role, delay);
            self
        }

        pub async fn push(&self, role: Role, output: impl Into<String>) {
            self.outputs.lock().await.entry(role).or_default().push_back(Ok(output.into()));
        }

        pub async fn push_err(&self, role: Role, message: &str) {
            self.outputs
                .lock()
                .await
                .entry(role)
                .or_default()
                .push_back(Err(TriloopError::Llm(message.to_string())));
        }

        pub async fn count(&self, role: Role) -> usize {
            self.calls.lock().await.iter().filter(|r| **r == role).count()
        }
    }

    #[async_trait]
    impl RoleInvoker for ScriptedInvoker {
        async fn invoke(&self, role: Role, _prompt: &str) -> Result<String> {
            self.calls.lock().await.push(role);
            if let Some(delay) = self.delays.get(&role) {
                tokio::time::sleep(*delay).await;
            }
            self.outputs
                .lock()
                .await
                .get_mut(&role)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| Ok(String::from("no report this time")))
        }
    }

    pub fn report(tag: &str, json: &str) -> String {
        format!("did some work\n<<<{}>>>\n{}\n<<<END>>>\n", tag, json)
    }

    pub fn context(dir: &std::path::Path, config: Config, invoker: Arc<ScriptedInvoker>) -> LoopContext {
        let (store, state) = StateStore::open(dir.join("state.json")).unwrap();
        tokio::spawn(store.run());
        LoopContext {
            state,
            trigger: RefactorTrigger::new(),
            termination: Termination::new(),
            config: Arc::new(config),
            invoker,
            prompts: Arc::new(RolePrompts::new("test goal").unwrap()),
            signal: Arc::new(KeywordSignal::default()),
        }
    }
}

//! Coordinator - runs the three role loops against one workspace
//!
//! The coordinator owns everything the loops share: the state store task, the
//! refactor trigger and the termination signal. It supervises the loops and
//! turns the final snapshot into a `RunOutcome`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::coordination::{KeywordSignal, RefactorSignal, RefactorTrigger, Termination, TerminationReason};
use crate::error::{Result, TriloopError};
use crate::loops::{LoopContext, LoopExit, Role, RoleInvoker, builder, refactorer, verifier};
use crate::prompt::RolePrompts;
use crate::report::Verdict;
use crate::state::{CoordinationState, StateStore};

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Complete,
    Incomplete,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Complete => write!(f, "COMPLETE"),
            RunStatus::Incomplete => write!(f, "INCOMPLETE"),
        }
    }
}

/// What the run achieved, read from the final snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub status: RunStatus,
    pub reason: Option<TerminationReason>,
    pub verdict: Verdict,
    pub exit_criteria_met: bool,
    pub iterations: u32,
    pub refactor_runs: u32,
    pub state_path: PathBuf,
}

impl RunOutcome {
    /// `COMPLETE` only when the snapshot itself satisfies the completion condition
    pub fn from_state(state: &CoordinationState, reason: Option<TerminationReason>, state_path: PathBuf) -> Self {
        let status = if state.is_complete() {
            RunStatus::Complete
        } else {
            RunStatus::Incomplete
        };
        Self {
            status,
            reason,
            verdict: state.verifier.verdict,
            exit_criteria_met: state.builder.exit_criteria_met,
            iterations: state.iteration,
            refactor_runs: state.refactorer.ran_count,
            state_path,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }
}

/// Runs one coordination session. Build a new one per run.
pub struct Coordinator {
    config: Arc<Config>,
    invoker: Arc<dyn RoleInvoker>,
    prompts: Arc<RolePrompts>,
    signal: Arc<dyn RefactorSignal>,
    termination: Termination,
}

impl Coordinator {
    pub fn new(config: Config, invoker: Arc<dyn RoleInvoker>, prompts: RolePrompts) -> Self {
        let signal = KeywordSignal::new(&config.refactor_keywords);
        Self {
            config: Arc::new(config),
            invoker,
            prompts: Arc::new(prompts),
            signal: Arc::new(signal),
            termination: Termination::new(),
        }
    }

    /// Replace the keyword heuristic used by the Verifier
    pub fn with_signal(mut self, signal: Arc<dyn RefactorSignal>) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_prompts(mut self, prompts: RolePrompts) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Shared termination signal, e.g. for an interrupt handler
    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    /// Run all three loops until termination, then report the final snapshot.
    ///
    /// A loop error stops the run; it is returned once every task has finished.
    /// When the Builder returns `Exhausted` it leaves termination alone; the
    /// coordinator raises `Exhausted` itself so the other two loops stop.
    pub async fn run(&self, workspace: &Path) -> Result<RunOutcome> {
        let state_path = self.config.state.resolve(workspace);
        let (store, state) = StateStore::open(&state_path)?;
        info!("Coordination state at {}", store.path().display());
        let store_task = tokio::spawn(store.run());

        let ctx = LoopContext {
            state,
            trigger: RefactorTrigger::new(),
            termination: self.termination.clone(),
            config: self.config.clone(),
            invoker: self.invoker.clone(),
            prompts: self.prompts.clone(),
            signal: self.signal.clone(),
        };

        let mut loops = JoinSet::new();
        let mut roles = HashMap::new();
        for role in Role::ALL {
            let ctx = ctx.clone();
            let handle = loops.spawn(async move {
                let exit = match role {
                    Role::Builder => builder::run(ctx).await,
                    Role::Verifier => verifier::run(ctx).await,
                    Role::Refactorer => refactorer::run(ctx).await,
                };
                (role, exit)
            });
            roles.insert(handle.id(), role);
        }

        let mut failure: Option<TriloopError> = None;
        while let Some(joined) = loops.join_next().await {
            match joined {
                Ok((role, Ok(exit))) => {
                    info!("{} loop finished: {:?}", role, exit);
                    if exit == LoopExit::Exhausted && self.termination.raise(TerminationReason::Exhausted) {
                        warn!(
                            "Builder used all {} iterations without completing",
                            self.config.coordination.max_iterations
                        );
                    }
                }
                Ok((role, Err(e))) => {
                    error!("{} loop failed: {}", role, e);
                    self.termination.raise(TerminationReason::Failed);
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    let role = roles.get(&e.id()).map_or("unknown", |r| r.name());
                    error!("{} loop aborted: {}", role, e);
                    self.termination.raise(TerminationReason::Failed);
                    failure.get_or_insert(TriloopError::LoopAborted {
                        role: role.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let final_state = ctx.state.snapshot();
        drop(ctx);

        match store_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failure.get_or_insert(e);
            }
            Err(e) => {
                failure.get_or_insert(TriloopError::Storage(format!("state owner aborted: {}", e)));
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let outcome = RunOutcome::from_state(&final_state, self.termination.reason(), state_path);
        info!(
            "Run {} after {} iteration(s): verdict {}, {} refactor pass(es)",
            outcome.status, outcome.iterations, outcome.verdict, outcome.refactor_runs
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loops::testing::{ScriptedInvoker, report};
    use crate::report::{BUILDER_TAG, Blocker, VERIFIER_TAG};
    use crate::state::{StateUpdate, VerifierState, load_snapshot};
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(max_iterations: u32) -> Config {
        let mut config = Config::default();
        config.coordination.max_iterations = max_iterations;
        config.coordination.verify_interval_ms = 1_000;
        config.coordination.refactor_poll_ms = 100;
        config
    }

    fn coordinator(config: Config, invoker: Arc<ScriptedInvoker>) -> Coordinator {
        Coordinator::new(config, invoker, RolePrompts::new("goal").unwrap())
    }

    #[test]
    fn test_outcome_requires_completion_condition() {
        let mut state = CoordinationState::new();
        state.apply(StateUpdate::Verifier(VerifierState {
            verdict: Verdict::Pass,
            ..Default::default()
        }));

        let outcome = RunOutcome::from_state(&state, Some(TerminationReason::Exhausted), PathBuf::from("s.json"));
        assert_eq!(outcome.status, RunStatus::Incomplete);
        assert_eq!(outcome.verdict, Verdict::Pass);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_outcome_serializes_status_uppercase() {
        let outcome = RunOutcome::from_state(&CoordinationState::new(), None, PathBuf::from("s.json"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "INCOMPLETE");
        assert_eq!(json["verdict"], "UNKNOWN");
        assert_eq!(json["refactorRuns"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_run_is_incomplete() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new().with_delay(Role::Builder, Duration::from_millis(400)));
        let coordinator = coordinator(config(2), invoker.clone());

        let outcome = coordinator.run(dir.path()).await.unwrap();

        assert_eq!(outcome.status, RunStatus::Incomplete);
        assert_eq!(outcome.reason, Some(TerminationReason::Exhausted));
        assert_eq!(outcome.iterations, 2);
        assert_eq!(invoker.count(Role::Builder).await, 2);

        let on_disk = load_snapshot(&outcome.state_path).unwrap();
        assert_eq!(on_disk.iteration, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_and_reports() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new().with_delay(Role::Builder, Duration::from_millis(300)));
        invoker
            .push(Role::Verifier, report(VERIFIER_TAG, r#"{"verdict": "PASS"}"#))
            .await;
        invoker
            .push(Role::Builder, report(BUILDER_TAG, r#"{"exitCriteriaMet": true}"#))
            .await;
        let coordinator =
            coordinator(config(5), invoker).with_prompts(RolePrompts::new("Serve /health with 200").unwrap());

        let outcome = coordinator.run(dir.path()).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.reason, Some(TerminationReason::Complete));
        assert!(outcome.exit_criteria_met);
        assert_eq!(outcome.iterations, 1);
    }

    struct AlwaysRefactor;

    impl RefactorSignal for AlwaysRefactor {
        fn recommends_refactor(&self, blockers: &[Blocker]) -> bool {
            !blockers.is_empty()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_signal_drives_refactor() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new().with_delay(Role::Builder, Duration::from_millis(500)));
        invoker
            .push(
                Role::Verifier,
                report(VERIFIER_TAG, r#"{"verdict": "FAIL", "blockers": [{"summary": "endpoint missing"}]}"#),
            )
            .await;
        let coordinator = coordinator(config(1), invoker.clone()).with_signal(Arc::new(AlwaysRefactor));

        let outcome = coordinator.run(dir.path()).await.unwrap();

        assert_eq!(outcome.refactor_runs, 1);
        assert_eq!(invoker.count(Role::Refactorer).await, 1);
    }

    struct PanicsOnVerify;

    #[async_trait::async_trait]
    impl RoleInvoker for PanicsOnVerify {
        async fn invoke(&self, role: Role, _prompt: &str) -> Result<String> {
            if role == Role::Verifier {
                panic!("verifier blew up");
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_loop_fails_the_run() {
        let dir = tempdir().unwrap();
        let coordinator = Coordinator::new(config(50), Arc::new(PanicsOnVerify), RolePrompts::new("goal").unwrap());

        let err = coordinator.run(dir.path()).await.unwrap_err();

        match err {
            TriloopError::LoopAborted { role, .. } => assert_eq!(role, "verifier"),
            other => panic!("expected aborted loop, got {:?}", other),
        }
        assert_eq!(coordinator.termination().reason(), Some(TerminationReason::Failed));
    }

    #[tokio::test]
    async fn test_unwritable_state_path_fails_to_start() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), "file").unwrap();
        let mut config = config(1);
        config.state.path = PathBuf::from("blocker/state.json");

        let err = coordinator(config, Arc::new(ScriptedInvoker::new()))
            .run(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, TriloopError::Storage(_)));
    }
}

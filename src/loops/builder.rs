//! Builder loop - continuous passes toward the goal

use log::{info, warn};

use super::{LoopContext, LoopExit, LoopPhase, Role, enter};
use crate::coordination::TerminationReason;
use crate::error::Result;
use crate::report::{BUILDER_TAG, BuilderReport, Extraction, extract_report};
use crate::state::{BuilderState, StateUpdate};

/// The Builder's sub-record for one pass's output
pub fn builder_update(output: &str) -> BuilderState {
    let extraction = extract_report::<BuilderReport>(output, BUILDER_TAG);
    let last_report = Some(extraction.to_last_report(output));
    match extraction {
        Extraction::Parsed(report) => BuilderState {
            last_report,
            exit_criteria_met: report.exit_criteria_met,
            wants_refactor: report.wants_refactor,
        },
        Extraction::Malformed { ref error, .. } => {
            warn!("Builder report is malformed: {}", error);
            BuilderState {
                last_report,
                ..Default::default()
            }
        }
        Extraction::NotFound => {
            warn!("Builder output has no report block");
            BuilderState {
                last_report,
                ..Default::default()
            }
        }
    }
}

/// Run Builder passes until completion, termination or the iteration limit.
///
/// Reaching the limit returns `LoopExit::Exhausted` without raising termination.
pub async fn run(ctx: LoopContext) -> Result<LoopExit> {
    let max_iterations = ctx.config.coordination.max_iterations;

    loop {
        enter(Role::Builder, LoopPhase::Idle);
        if ctx.termination.is_raised() {
            enter(Role::Builder, LoopPhase::Done);
            return Ok(LoopExit::Terminated);
        }

        let current = ctx.state.snapshot();
        if current.iteration >= max_iterations {
            info!(
                "Builder reached max iterations ({}) with verdict {}",
                max_iterations, current.verifier.verdict
            );
            enter(Role::Builder, LoopPhase::Done);
            return Ok(LoopExit::Exhausted);
        }

        let state = ctx.state.apply(StateUpdate::BeginIteration).await?;
        info!("Builder iteration {}/{}", state.iteration, max_iterations);
        let prompt = ctx.prompts.render(Role::Builder, &state)?;

        enter(Role::Builder, LoopPhase::Invoking);
        let output = match ctx.invoker.invoke(Role::Builder, &prompt).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Builder iteration {} failed: {}", state.iteration, e);
                continue;
            }
        };

        enter(Role::Builder, LoopPhase::Updating);
        let update = builder_update(&output);
        let wants_refactor = update.wants_refactor;
        let state = ctx.state.apply(StateUpdate::Builder(update)).await?;

        if wants_refactor && ctx.trigger.set() {
            info!("Builder requested a refactor");
        }

        if state.is_complete() {
            if ctx.termination.raise(TerminationReason::Complete) {
                info!("Builder observed completion on iteration {}", state.iteration);
            }
            enter(Role::Builder, LoopPhase::Done);
            return Ok(LoopExit::Complete);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::loops::testing::{ScriptedInvoker, context, report};
    use crate::report::{LastReport, Verdict};
    use crate::state::VerifierState;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(max_iterations: u32) -> Config {
        let mut config = Config::default();
        config.coordination.max_iterations = max_iterations;
        config
    }

    #[test]
    fn test_builder_update_parsed() {
        let output = report(BUILDER_TAG, r#"{"exitCriteriaMet": true, "wantsRefactor": true}"#);
        let update = builder_update(&output);

        assert!(update.exit_criteria_met);
        assert!(update.wants_refactor);
        assert!(matches!(update.last_report, Some(LastReport::Structured(_))));
    }

    #[test]
    fn test_builder_update_malformed_keeps_raw() {
        let output = report(BUILDER_TAG, r#"{"exitCriteriaMet": tru"#);
        let update = builder_update(&output);

        assert!(!update.exit_criteria_met);
        match update.last_report {
            Some(LastReport::Malformed { raw, parse_error }) => {
                assert_eq!(raw, "\n{\"exitCriteriaMet\": tru\n");
                assert!(!parse_error.is_empty());
            }
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_update_without_block() {
        let update = builder_update("I wrote some code");
        assert_eq!(update.last_report, Some(LastReport::Raw("I wrote some code".to_string())));
        assert!(!update.wants_refactor);
    }

    #[tokio::test]
    async fn test_stops_at_max_iterations_without_raising() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        let ctx = context(dir.path(), config(3), invoker.clone());

        let exit = run(ctx.clone()).await.unwrap();

        assert_eq!(exit, LoopExit::Exhausted);
        assert_eq!(ctx.state.snapshot().iteration, 3);
        assert_eq!(invoker.count(Role::Builder).await, 3);
        assert!(!ctx.termination.is_raised());
    }

    #[tokio::test]
    async fn test_completes_when_verifier_already_passes() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker
            .push(Role::Builder, report(BUILDER_TAG, r#"{"exitCriteriaMet": false}"#))
            .await;
        invoker
            .push(Role::Builder, report(BUILDER_TAG, r#"{"exitCriteriaMet": true}"#))
            .await;
        let ctx = context(dir.path(), config(10), invoker.clone());
        ctx.state
            .apply(StateUpdate::Verifier(VerifierState {
                verdict: Verdict::Pass,
                ..Default::default()
            }))
            .await
            .unwrap();

        let exit = run(ctx.clone()).await.unwrap();

        assert_eq!(exit, LoopExit::Complete);
        assert_eq!(ctx.state.snapshot().iteration, 2);
        assert_eq!(ctx.termination.reason(), Some(TerminationReason::Complete));
    }

    #[tokio::test]
    async fn test_wants_refactor_sets_trigger() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker
            .push(Role::Builder, report(BUILDER_TAG, r#"{"wantsRefactor": true}"#))
            .await;
        let ctx = context(dir.path(), config(1), invoker);

        run(ctx.clone()).await.unwrap();

        assert!(ctx.trigger.is_pending());
        assert!(ctx.state.snapshot().builder.wants_refactor);
    }

    #[tokio::test]
    async fn test_invocation_failure_leaves_record_and_continues() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        invoker
            .push(Role::Builder, report(BUILDER_TAG, r#"{"wantsRefactor": true}"#))
            .await;
        invoker.push_err(Role::Builder, "rate limited").await;
        let ctx = context(dir.path(), config(2), invoker.clone());

        let exit = run(ctx.clone()).await.unwrap();

        let state = ctx.state.snapshot();
        assert_eq!(exit, LoopExit::Exhausted);
        assert_eq!(state.iteration, 2);
        assert!(state.builder.wants_refactor);
        assert_eq!(invoker.count(Role::Builder).await, 2);
    }

    #[tokio::test]
    async fn test_returns_immediately_when_terminated() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new());
        let ctx = context(dir.path(), config(5), invoker.clone());
        ctx.termination.raise(TerminationReason::Failed);

        assert_eq!(run(ctx.clone()).await.unwrap(), LoopExit::Terminated);
        assert_eq!(ctx.state.snapshot().iteration, 0);
        assert_eq!(invoker.count(Role::Builder).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_pass_finishes_after_termination() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::new().with_delay(Role::Builder, Duration::from_secs(30)));
        invoker
            .push(Role::Builder, report(BUILDER_TAG, r#"{"wantsRefactor": true}"#))
            .await;
        let ctx = context(dir.path(), config(5), invoker.clone());

        let task = tokio::spawn(run(ctx.clone()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(invoker.count(Role::Builder).await, 1);
        ctx.termination.raise(TerminationReason::Failed);

        assert_eq!(task.await.unwrap().unwrap(), LoopExit::Terminated);
        let state = ctx.state.snapshot();
        assert_eq!(state.iteration, 1);
        assert!(state.builder.wants_refactor);
        assert!(matches!(state.builder.last_report, Some(LastReport::Structured(_))));
        assert_eq!(invoker.count(Role::Builder).await, 1);
    }
}

//! Verifier loop - interval-based independent verification

use log::{info, warn};

use super::{LoopContext, LoopExit, LoopPhase, Role, enter};
use crate::coordination::{RefactorSignal, TerminationReason};
use crate::error::Result;
use crate::report::{Extraction, VERIFIER_TAG, Verdict, VerifierReport, extract_report};
use crate::state::{StateUpdate, VerifierState};

/// The Verifier's sub-record for one pass's output.
///
/// A refactor is recommended when the report says so or when `signal` finds
/// structural wording in the blockers.
pub fn verifier_update(output: &str, signal: &dyn RefactorSignal) -> VerifierState {
    let extraction = extract_report::<VerifierReport>(output, VERIFIER_TAG);
    let last_report = Some(extraction.to_last_report(output));
    match extraction {
        Extraction::Parsed(report) => {
            let refactor_recommended = report.refactor_recommended || signal.recommends_refactor(&report.blockers);
            VerifierState {
                last_report,
                verdict: report.verdict,
                blockers: report.blockers,
                refactor_recommended,
            }
        }
        Extraction::Malformed { ref error, .. } => {
            warn!("Verifier report is malformed: {}", error);
            VerifierState {
                last_report,
                ..Default::default()
            }
        }
        Extraction::NotFound => {
            warn!("Verifier output has no report block");
            VerifierState {
                last_report,
                ..Default::default()
            }
        }
    }
}

/// Verify, then wait `verify_interval`, until completion or termination.
pub async fn run(ctx: LoopContext) -> Result<LoopExit> {
    let interval = ctx.config.coordination.verify_interval();

    loop {
        enter(Role::Verifier, LoopPhase::Idle);
        if ctx.termination.is_raised() {
            enter(Role::Verifier, LoopPhase::Done);
            return Ok(LoopExit::Terminated);
        }

        let prompt = ctx.prompts.render(Role::Verifier, &ctx.state.snapshot())?;

        enter(Role::Verifier, LoopPhase::Invoking);
        match ctx.invoker.invoke(Role::Verifier, &prompt).await {
            Ok(output) => {
                enter(Role::Verifier, LoopPhase::Updating);
                let update = verifier_update(&output, ctx.signal.as_ref());
                let recommend = update.refactor_recommended;
                let state = ctx.state.apply(StateUpdate::Verifier(update)).await?;
                info!(
                    "Verifier verdict {} with {} blocker(s)",
                    state.verifier.verdict,
                    state.verifier.blockers.len()
                );

                if state.is_complete() {
                    if ctx.termination.raise(TerminationReason::Complete) {
                        info!("Verifier observed completion on iteration {}", state.iteration);
                    }
                    enter(Role::Verifier, LoopPhase::Done);
                    return Ok(LoopExit::Complete);
                }

                if state.verifier.verdict == Verdict::Fail && recommend && ctx.trigger.set() {
                    info!("Verifier requested a refactor");
                }
            }
            Err(e) => warn!("Verifier pass failed: {}", e),
        }

        enter(Role::Verifier, LoopPhase::Waiting);
        if !ctx.termination.sleep(interval).await {
            enter(Role::Verifier, LoopPhase::Done);
            return Ok(LoopExit::Terminated);
        }
    }
}

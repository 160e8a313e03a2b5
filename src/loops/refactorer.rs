//! Refactorer loop - runs once per consumed trigger, never over a passing verdict

use chrono::Utc;
use log::{debug, info, warn};

use super::{LoopContext, LoopExit, LoopPhase, Role, enter};
use crate::error::Result;
use crate::report::{Extraction, REFACTORER_TAG, RefactorerReport, extract_report};
use crate::state::StateUpdate;

/// Poll the trigger every `refactor_poll_ms` until termination.
pub async fn run(ctx: LoopContext) -> Result<LoopExit> {
    let poll = ctx.config.coordination.refactor_poll();

    loop {
        enter(Role::Refactorer, LoopPhase::Waiting);
        if !ctx.termination.sleep(poll).await {
            enter(Role::Refactorer, LoopPhase::Done);
            return Ok(LoopExit::Terminated);
        }

        enter(Role::Refactorer, LoopPhase::Idle);
        if !ctx.trigger.take() {
            continue;
        }

        let state = ctx.state.snapshot();
        if state.verifier.verdict.is_pass() {
            info!("Refactor request discarded: verification is passing");
            continue;
        }

        let prompt = ctx.prompts.render(Role::Refactorer, &state)?;

        enter(Role::Refactorer, LoopPhase::Invoking);
        let output = match ctx.invoker.invoke(Role::Refactorer, &prompt).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Refactorer pass failed: {}", e);
                continue;
            }
        };

        enter(Role::Refactorer, LoopPhase::Updating);
        let extraction = extract_report::<RefactorerReport>(&output, REFACTORER_TAG);
        if let Extraction::Parsed(report) = &extraction {
            debug!("Refactorer applied: {:?}", report.refactors_applied);
        }
        let state = ctx
            .state
            .apply(StateUpdate::RefactorerRan {
                last_report: extraction.to_last_report(&output),
                at: Utc::now(),
            })
            .await?;
        info!("Refactorer finished pass {}", state.refactorer.ran_count);
    }
}

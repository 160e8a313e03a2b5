//! The shared coordination record and the updates that mutate it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::{Blocker, LastReport, Verdict};

/// Single record shared by the three role loops.
///
/// Each sub-record has exactly one writer: `builder` and `iteration` belong to
/// the Builder loop, `verifier` to the Verifier loop, `refactorer` to the
/// Refactorer loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationState {
    pub started_at: DateTime<Utc>,
    pub iteration: u32,
    pub builder: BuilderState,
    pub verifier: VerifierState,
    pub refactorer: RefactorerState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderState {
    pub last_report: Option<LastReport>,
    pub exit_criteria_met: bool,
    pub wants_refactor: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierState {
    pub last_report: Option<LastReport>,
    pub verdict: Verdict,
    pub blockers: Vec<Blocker>,
    pub refactor_recommended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorerState {
    pub last_report: Option<LastReport>,
    pub ran_count: u32,
    pub last_ran_at: Option<DateTime<Utc>>,
}

impl CoordinationState {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            iteration: 0,
            builder: BuilderState::default(),
            verifier: VerifierState::default(),
            refactorer: RefactorerState::default(),
        }
    }

    /// Builder says it is done and the Verifier agrees
    pub fn is_complete(&self) -> bool {
        self.builder.exit_criteria_met && self.verifier.verdict.is_pass()
    }

    /// Apply an update, replacing exactly the sub-record it owns
    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::BeginIteration => self.iteration += 1,
            StateUpdate::Builder(builder) => self.builder = builder,
            StateUpdate::Verifier(verifier) => self.verifier = verifier,
            StateUpdate::RefactorerRan { last_report, at } => {
                self.refactorer.last_report = Some(last_report);
                self.refactorer.ran_count += 1;
                self.refactorer.last_ran_at = Some(at);
            }
        }
    }
}

impl Default for CoordinationState {
    fn default() -> Self {
        Self::new()
    }
}

/// A role loop's change to the shared record
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// Builder starts a new pass
    BeginIteration,
    /// Builder replaces its sub-record
    Builder(BuilderState),
    /// Verifier replaces its sub-record
    Verifier(VerifierState),
    /// Refactorer finished one pass
    RefactorerRan { last_report: LastReport, at: DateTime<Utc> },
}

impl StateUpdate {
    /// Name of the loop that owns this update, for logging
    pub fn owner(&self) -> &'static str {
        match self {
            StateUpdate::BeginIteration | StateUpdate::Builder(_) => "builder",
            StateUpdate::Verifier(_) => "verifier",
            StateUpdate::RefactorerRan { .. } => "refactorer",
        }
    }
}

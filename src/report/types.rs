//! Structured report shapes emitted by each role
//!
//! Every field defaults when absent. A field of the wrong type fails the whole
//! report, which the loops treat as a malformed report.

use serde::{Deserialize, Serialize};

/// Verifier's judgment of the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Unknown => "UNKNOWN",
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A specific reason the Verifier judged the workspace not passing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blocker {
    pub ids: Vec<String>,
    pub summary: String,
    pub fix: String,
}

impl Blocker {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn with_ids(mut self, ids: &[&str]) -> Self {
        self.ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = fix.into();
        self
    }
}

/// A command a role ran and its exit status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandRun {
    pub cmd: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Coverage {
    pub fr_passed: u32,
    pub fr_total: u32,
    pub uc_passed: u32,
    pub uc_total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuilderReport {
    pub exit_criteria_met: bool,
    pub wants_refactor: bool,
    pub completed: Vec<String>,
    pub next: Vec<String>,
    pub commands_run: Vec<CommandRun>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifierReport {
    pub verdict: Verdict,
    pub refactor_recommended: bool,
    pub blockers: Vec<Blocker>,
    pub commands: Vec<CommandRun>,
    pub coverage: Coverage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefactorerReport {
    pub refactors_applied: Vec<String>,
    pub commands_run: Vec<CommandRun>,
    pub notes: String,
}

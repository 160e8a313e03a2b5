//! Role reports - the structured block each role ends its output with
//!
//! Roles write free text followed by exactly one `<<<TAG>>> {json} <<<END>>>`
//! block. Extraction never fails hard: a missing or broken block is kept as
//! raw text so it can be inspected later.

pub mod extract;
pub mod types;

pub use extract::{END_MARKER, Extraction, LastReport, extract_report, find_block, start_marker};
pub use types::{
    Blocker, BuilderReport, CommandRun, Coverage, RefactorerReport, Verdict, VerifierReport,
};

/// Tag for the Builder's report block
pub const BUILDER_TAG: &str = "BUILDER_REPORT_JSON";
/// Tag for the Verifier's report block
pub const VERIFIER_TAG: &str = "VERIFIER_REPORT_JSON";
/// Tag for the Refactorer's report block
pub const REFACTORER_TAG: &str = "REFACTORER_REPORT_JSON";

//! Triloop - Builder, Verifier and Refactorer agents coordinated on one workspace
//!
//! Three independently paced role loops share a workspace lock, a single
//! coordination record and a refactor trigger. The run ends when the Builder
//! reports its exit criteria met while the Verifier's verdict is PASS, or when
//! the Builder runs out of iterations.

pub mod config;
pub mod coordination;
pub mod error;
pub mod llm;
pub mod loops;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod state;
pub mod tools;

pub use error::{Result, TriloopError};

//! Runner module - supervises a full coordination session.
//!
//! This module provides:
//! - Coordinator, which spawns and joins the three role loops
//! - RunOutcome and RunStatus for reporting the result

mod coordinator;

pub use coordinator::{Coordinator, RunOutcome, RunStatus};

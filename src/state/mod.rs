//! Shared coordination state
//!
//! The record every loop reads, the typed updates that change it, and the
//! owner task that applies updates and keeps the durable JSON snapshot current.

pub mod record;
pub mod store;

pub use record::{BuilderState, CoordinationState, RefactorerState, StateUpdate, VerifierState};
pub use store::{StateHandle, StateStore, load_snapshot};

/// Default location of the durable snapshot, relative to the workspace root
pub const DEFAULT_STATE_PATH: &str = ".triloop/state.json";

//! Loop coordination module
//!
//! The primitives the three role loops share: the workspace lock, the refactor
//! trigger, the termination signal and the refactor heuristic.

pub mod heuristic;
pub mod lock;
pub mod termination;
pub mod trigger;

pub use heuristic::{DEFAULT_REFACTOR_KEYWORDS, KeywordSignal, RefactorSignal};
pub use lock::WorkspaceLock;
pub use termination::{Termination, TerminationReason};
pub use trigger::RefactorTrigger;

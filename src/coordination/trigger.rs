//! Refactor trigger - single-slot signal between the role loops
//!
//! Builder and Verifier loops `set` it; only the Refactorer loop `take`s it.
//! Sets collapse: any number of sets before a take is one pending refactor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Pending-refactor flag with atomic read-and-clear
#[derive(Clone, Default)]
pub struct RefactorTrigger {
    pending: Arc<AtomicBool>,
    sets: Arc<AtomicU64>,
}

impl RefactorTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a refactor pass. Returns true if the slot was previously empty.
    pub fn set(&self) -> bool {
        self.sets.fetch_add(1, Ordering::Relaxed);
        !self.pending.swap(true, Ordering::AcqRel)
    }

    /// Consume the pending request, if any.
    ///
    /// A set racing with this call is either consumed here or left pending for
    /// the next take, never lost.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Peek without consuming
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Total number of `set` calls, including collapsed ones
    pub fn set_count(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RefactorTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefactorTrigger")
            .field("pending", &self.is_pending())
            .field("sets", &self.set_count())
            .finish()
    }
}

//! Termination controller - the one shut-down signal every loop observes
//!
//! Raising is single-shot: the first raise records its reason and cancels the
//! shared token, later raises change nothing. Waits taken through `sleep`
//! resolve as soon as the token is cancelled.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Why the run was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationReason {
    /// Builder exit criteria met and verification passing
    Complete,
    /// Builder reached its iteration limit without completing
    Exhausted,
    /// A loop hit an unrecoverable error
    Failed,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Complete => write!(f, "complete"),
            TerminationReason::Exhausted => write!(f, "exhausted"),
            TerminationReason::Failed => write!(f, "failed"),
        }
    }
}

/// Broadcast cancellation shared by reference across all loops
#[derive(Clone, Default)]
pub struct Termination {
    token: CancellationToken,
    reason: Arc<OnceLock<TerminationReason>>,
}

impl Termination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise termination. Returns true only for the call that took effect.
    pub fn raise(&self, reason: TerminationReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        if first {
            log::info!("Termination raised: {}", reason);
        }
        self.token.cancel();
        first
    }

    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason recorded by the first raise
    pub fn reason(&self) -> Option<TerminationReason> {
        self.reason.get().copied()
    }

    /// Resolves once termination has been raised
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Interruptible wait. Returns false if termination cut the wait short
    /// (or was already raised), true if the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_raised() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_raised(),
            _ = self.token.cancelled() => false,
        }
    }
}

impl fmt::Debug for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Termination")
            .field("raised", &self.is_raised())
            .field("reason", &self.reason())
            .finish()
    }
}

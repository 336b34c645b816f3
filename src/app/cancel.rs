//! Cooperative cancellation for long-running sequences.
//!
//! The token is a shared flag.  A scheduler thread or signal handler holds
//! a clone and trips it; the sequence engine checks it before every slew,
//! dither and exposure and winds down through `GuideStopping`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.  Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the next sequence can run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

//! Cooperative cancellation.
//!
//! The token is handed down through the pipeline stages and polled at
//! defined checkpoints; an in-flight per-pixel reduction always runs to
//! completion before the next poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, VestaError};

#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Poll point: returns `Err(Cancelled)` once `cancel` was called.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(VestaError::Cancelled)
        } else {
            Ok(())
        }
    }
}

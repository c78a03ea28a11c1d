//! Operator interrupt
//!
//! A single-slot cancellation token. A signal handler raises it; the
//! scheduler observes and clears it once per poll iteration. Raising it twice
//! before it is taken leaves one pending interrupt.

use std::sync::atomic::{AtomicBool, Ordering};

/// Pending-interrupt flag, safe to raise from a signal handler.
#[derive(Debug, Default)]
pub struct InterruptSignal {
    pending: AtomicBool,
}

impl InterruptSignal {
    /// A token with no interrupt pending.
    pub const fn new() -> Self {
        InterruptSignal {
            pending: AtomicBool::new(false),
        }
    }

    /// Mark an interrupt pending. Does nothing else.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Observe and clear: true if an interrupt was pending.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether an interrupt is pending, without clearing it.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

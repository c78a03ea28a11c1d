//! Session state shared with the render thread
//!
//! The engine's render context and the scheduler both look at a session's
//! completion and position. That record lives behind a
//! [`RecursiveMutex`](crate::platform::RecursiveMutex), owned by the session
//! and the mixer jointly.

use crate::platform;

/// Posted once when a session finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionNotice {
    /// Platform clock reading at completion, in microseconds
    pub at_micros: u64,
    /// Raw position when the session finished
    pub position: u64,
    /// Whether the session ended because of a stop request
    pub stopped: bool,
}

/// Completion flag, position and the pending completion notice.
#[derive(Debug, Clone, Default)]
pub struct SharedSessionState {
    done: bool,
    position: u64,
    completion: Option<CompletionNotice>,
}

impl SharedSessionState {
    /// Fresh, unfinished state at position zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session has finished.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Last published raw position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Publish a new raw position.
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    /// Mark the session finished and post a notice. Later calls are no-ops.
    pub fn finish(&mut self, stopped: bool) {
        if self.done {
            return;
        }
        self.done = true;
        self.completion = Some(CompletionNotice {
            at_micros: platform::now(),
            position: self.position,
            stopped,
        });
    }

    /// Clear completion so the session can be started again.
    pub fn rearm(&mut self) {
        self.done = false;
        self.position = 0;
        self.completion = None;
    }

    /// Take the pending notice, if any.
    pub fn take_completion(&mut self) -> Option<CompletionNotice> {
        self.completion.take()
    }
}

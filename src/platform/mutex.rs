//! Re-entrant mutual exclusion
//!
//! Guards state shared between the scheduler thread and an engine render
//! thread. The owning thread may acquire the lock again without deadlocking
//! and must release it the same number of times before another thread gets in.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;

/// Recursive lock around a value of type `T`.
///
/// Creation is [`RecursiveMutex::new`], destruction is `Drop`. Acquiring
/// returns a guard; dropping the guard releases one level of ownership.
///
/// The guard hands out a [`RefCell`], so nested acquisition is fine but a
/// mutable borrow must not be held across a nested [`RecursiveMutex::with`].
#[derive(Debug, Default)]
pub struct RecursiveMutex<T> {
    inner: ReentrantMutex<RefCell<T>>,
}

impl<T> RecursiveMutex<T> {
    /// Create a new, unlocked mutex holding `value`.
    pub fn new(value: T) -> Self {
        RecursiveMutex {
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Acquire the lock, blocking until the current thread owns it.
    pub fn acquire(&self) -> ReentrantMutexGuard<'_, RefCell<T>> {
        self.inner.lock()
    }

    /// Try to acquire the lock without blocking.
    pub fn try_acquire(&self) -> Option<ReentrantMutexGuard<'_, RefCell<T>>> {
        self.inner.try_lock()
    }

    /// Run `f` with exclusive access to the guarded value.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let guard = self.inner.lock();
        let mut value = guard.borrow_mut();
        f(&mut value)
    }

    /// Whether any thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Whether the calling thread holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.inner.is_owned_by_current_thread()
    }

    /// Consume the mutex and return the guarded value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

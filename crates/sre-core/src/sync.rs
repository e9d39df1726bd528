//! Lock helpers for the shared state held by mock clients.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Extension trait for `Mutex` that treats a poisoned lock as usable.
///
/// A panic while a call history is being recorded already fails the test
/// that caused it; the recorded data itself stays valid.
pub trait IgnoreLock<T> {
    /// Locks the mutex, recovering the guard from a poisoned lock.
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;

    /// Runs `action` with the locked value and returns its result.
    fn with_lock<R>(&self, action: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock_ignore_poison();
        action(&mut guard)
    }
}

impl<T> IgnoreLock<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Single-call reentrancy lock

use crate::error::{ProtocolError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Held for the duration of a guarded entry point
#[derive(Debug, Default)]
pub struct ReentrancyLock {
    entered: AtomicBool,
}

/// Releases the lock when dropped, on success and failure alike
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, failing if a guarded call is already in progress
    pub fn enter(&self) -> Result<LockGuard<'_>> {
        if self.entered.swap(true, Ordering::AcqRel) {
            log::warn!("Reentrant call rejected");
            return Err(ProtocolError::ReentrancyGuard);
        }
        Ok(LockGuard { lock: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.entered.store(false, Ordering::Release);
    }
}

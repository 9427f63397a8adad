// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Poison-recovering lock helpers.
//!
//! A panic on a thread holding a tracker lock must not take every reader
//! down with it. These helpers log the poisoning and hand back the guard.
//!
//! ```no_run
//! use std::sync::RwLock;
//! use pullwatch::locks::{resilient_read, resilient_write};
//!
//! let lock = RwLock::new(0u64);
//! *resilient_write(&lock) += 1;
//! assert_eq!(*resilient_read(&lock), 1);
//! ```

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a shared read lock, recovering from poisoning.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "pullwatch::locks",
                event = "LOCK_POISONED_READ",
                "RwLock poisoned during read acquisition; recovering. \
                 A thread panicked while holding this lock."
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire the exclusive write lock, recovering from poisoning.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "pullwatch::locks",
                event = "LOCK_POISONED_WRITE",
                "RwLock poisoned during write acquisition; recovering. \
                 A thread panicked while holding this lock."
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_read_after_write() {
        let lock = RwLock::new(vec![1u64]);
        resilient_write(&lock).push(2);
        assert_eq!(*resilient_read(&lock), vec![1, 2]);
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let lock = Arc::new(RwLock::new(7u64));
        let lock_clone = Arc::clone(&lock);

        // Poison the lock by panicking while holding it
        let handle = thread::spawn(move || {
            let _guard = lock_clone.write().unwrap();
            panic!("intentional panic to poison lock");
        });
        let _ = handle.join();
        assert!(lock.is_poisoned());

        assert_eq!(*resilient_read(&lock), 7);
        *resilient_write(&lock) = 9;
        assert_eq!(*resilient_read(&lock), 9);
    }
}

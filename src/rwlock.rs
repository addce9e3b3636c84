//! Writer-preferring reader-writer lock.
//!
//! Readers and the writer bit live in two separate words rather than one
//! packed state, because a reader has to commit its increment optimistically
//! and then check for a concurrent writer — packing both into a single CAS
//! word gives no way to observe (and no room to test) that race.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::backoff::Backoff;
use crate::cc::unlikely;
use crate::pr::word32;

/// A writer-preferring reader-writer lock.
///
/// Once a writer announces intent (`writer != 0`), no new reader may enter;
/// existing readers drain normally. This starves readers under continuous
/// writer arrivals — accepted in exchange for writers never starving.
#[repr(C)]
pub struct RwLock<T: ?Sized> {
    readers: AtomicU32,
    writer: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> RwLock<T> {
    /// Creates a new unlocked reader-writer lock.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            readers: AtomicU32::new(0),
            writer: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Attempts to acquire a read lock without spinning.
    ///
    /// Fails if a writer is present or arrives before the optimistic
    /// increment below is confirmed race-free.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        if word32::load(&self.writer) != 0 {
            return None;
        }

        let r = word32::load(&self.readers);
        let (_, won) = word32::cmpxchg(&self.readers, r, r + 1);
        if !won {
            return None;
        }

        if unlikely(word32::load(&self.writer) != 0) {
            // A writer announced itself between our check and our CAS.
            // Roll back the optimistic increment and report failure.
            word32::fetch_sub(&self.readers, 1);
            return None;
        }

        Some(RwLockReadGuard { lock: self })
    }

    /// Acquires a read lock, busy-waiting with backoff if necessary.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            while word32::load(&self.writer) != 0 {
                backoff.spin();
            }

            let r = word32::load(&self.readers);
            let (_, won) = word32::cmpxchg(&self.readers, r, r + 1);
            if !won {
                backoff.spin();
                continue;
            }

            if unlikely(word32::load(&self.writer) != 0) {
                word32::fetch_sub(&self.readers, 1);
                backoff.spin();
                continue;
            }

            return RwLockReadGuard { lock: self };
        }
    }

    /// Attempts to acquire a write lock without spinning.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        if word32::xchg(&self.writer, 1) != 0 {
            return None;
        }
        if word32::load(&self.readers) != 0 {
            word32::store_release(&self.writer, 0);
            return None;
        }
        Some(RwLockWriteGuard { lock: self })
    }

    /// Acquires a write lock, busy-waiting with backoff if necessary.
    ///
    /// Once the writer bit is set, no new reader can enter; this call then
    /// only waits for readers already in flight to drain.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let mut backoff = Backoff::new();
        while word32::xchg(&self.writer, 1) != 0 {
            backoff.spin();
        }

        backoff = Backoff::new();
        while word32::load(&self.readers) != 0 {
            backoff.spin();
        }

        RwLockWriteGuard { lock: self }
    }

    /// Returns whether the lock is currently held for writing.
    #[inline]
    pub fn is_locked_exclusive(&self) -> bool {
        word32::load(&self.writer) != 0
    }

    /// Returns the current reader count.
    ///
    /// Advisory only: may be stale by the time it is observed.
    #[inline]
    pub fn reader_count(&self) -> u32 {
        word32::load(&self.readers)
    }
}

unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

/// RAII read guard for [`RwLock`]. Releases on drop.
pub struct RwLockReadGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

impl<T: ?Sized> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        word32::fetch_sub(&self.lock.readers, 1);
    }
}

/// RAII write guard for [`RwLock`]. Releases on drop.
pub struct RwLockWriteGuard<'a, T: ?Sized> {
    lock: &'a RwLock<T>,
}

impl<T: ?Sized> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        word32::store_release(&self.lock.writer, 0);
    }
}

//! Phase-fair reader-writer lock.
//!
//! Reader and writer access alternate in phases: once any writer arrives,
//! the read phase closes and no new reader may enter until that writer (and
//! only that writer) has come and gone, at which point the read phase
//! reopens. This bounds both reader and writer wait times under a steady
//! mix, unlike the plain writer-preferring [`crate::rwlock::RwLock`], which
//! only bounds writer wait time.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::backoff::Backoff;
use crate::pr::word32;

/// A phase-fair reader-writer lock.
#[repr(C)]
pub struct PfLock<T: ?Sized> {
    readers: AtomicU32,
    writers: AtomicU32,
    writer_active: AtomicU32,
    read_phase: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> PfLock<T> {
    /// Creates a new unlocked phase-fair lock, open for reading.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            readers: AtomicU32::new(0),
            writers: AtomicU32::new(0),
            writer_active: AtomicU32::new(0),
            read_phase: AtomicU32::new(1),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires a read lock, busy-waiting with backoff if necessary.
    pub fn read(&self) -> PfLockReadGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            while word32::load(&self.writer_active) != 0 || word32::load(&self.read_phase) == 0 {
                backoff.spin();
            }

            let r = word32::load(&self.readers);
            let (_, won) = word32::cmpxchg(&self.readers, r, r + 1);
            if !won {
                backoff.spin();
                continue;
            }

            if word32::load(&self.writer_active) != 0 {
                // A writer slipped in after our phase check but before our
                // CAS committed; unwind and retry.
                word32::fetch_sub(&self.readers, 1);
                backoff.spin();
                continue;
            }

            return PfLockReadGuard { lock: self };
        }
    }

    /// Acquires a write lock, busy-waiting with backoff if necessary.
    pub fn write(&self) -> PfLockWriteGuard<'_, T> {
        word32::fetch_add(&self.writers, 1);
        word32::store(&self.read_phase, 0);

        let mut backoff = Backoff::new();
        while word32::load(&self.readers) != 0 {
            backoff.spin();
        }

        backoff = Backoff::new();
        while word32::xchg(&self.writer_active, 1) != 0 {
            backoff.spin();
        }

        word32::fetch_sub(&self.writers, 1);

        PfLockWriteGuard { lock: self }
    }

    /// Returns whether a writer currently holds the lock.
    #[inline]
    pub fn is_write_locked(&self) -> bool {
        word32::load(&self.writer_active) != 0
    }

    /// Returns the current reader count.
    ///
    /// Advisory only: may be stale by the time it is observed.
    #[inline]
    pub fn reader_count(&self) -> u32 {
        word32::load(&self.readers)
    }
}

unsafe impl<T: Send> Send for PfLock<T> {}
unsafe impl<T: Send + Sync> Sync for PfLock<T> {}

/// RAII read guard for [`PfLock`]. Releases on drop.
pub struct PfLockReadGuard<'a, T: ?Sized> {
    lock: &'a PfLock<T>,
}

impl<T: ?Sized> Deref for PfLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for PfLockReadGuard<'_, T> {
    fn drop(&mut self) {
        word32::fetch_sub(&self.lock.readers, 1);
    }
}

/// RAII write guard for [`PfLock`]. Releases on drop.
pub struct PfLockWriteGuard<'a, T: ?Sized> {
    lock: &'a PfLock<T>,
}

impl<T: ?Sized> Deref for PfLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for PfLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for PfLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        word32::store_release(&self.lock.writer_active, 0);
        word32::store(&self.lock.read_phase, 1);
    }
}

//! Anderson array-based queueing lock.
//!
//! Each waiter draws a slot index from a bounded ring (`next_slot mod N`)
//! and spins on that slot's flag rather than on shared lock state, so
//! waiters never contend with each other — only the current holder's
//! release touches the next waiter's slot. This gives the same
//! one-cache-line-per-waiter property as MCS/CLH without needing a queue
//! node or a pointer-chasing release, at the cost of a fixed upper bound
//! on concurrent waiters.

use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::cacheline::CacheAligned;
use crate::pr::word32;

/// Largest slot count a single [`AndersonLock`] may be configured with.
pub const MAX_SLOTS: usize = 64;

/// Error returned by [`AndersonLock::new`] for an invalid slot count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndersonError {
    /// `N` was zero; a lock with no slots can never be acquired.
    ZeroSlots,
    /// `N` exceeded [`MAX_SLOTS`].
    TooManySlots { requested: usize },
}

impl fmt::Display for AndersonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AndersonError::ZeroSlots => write!(f, "anderson lock requires at least one slot"),
            AndersonError::TooManySlots { requested } => write!(
                f,
                "anderson lock supports at most {MAX_SLOTS} slots, requested {requested}"
            ),
        }
    }
}

impl core::error::Error for AndersonError {}

/// An Anderson array-based queueing lock, bounded to `N` concurrent
/// waiters.
///
/// `N` is fixed at construction and must be sized to the maximum number of
/// callers that may be between `lock` and `unlock` simultaneously;
/// exceeding it breaks mutual exclusion and is the caller's contract to
/// avoid, not something this type can detect.
pub struct AndersonLock<T: ?Sized> {
    next_slot: AtomicU32,
    serving_slot: AtomicU32,
    slots: usize,
    flags: Vec<CacheAligned<AtomicU32>>,
    data: UnsafeCell<T>,
}

impl<T> AndersonLock<T> {
    /// Creates a lock with `slots` waiter slots.
    ///
    /// Fails if `slots` is zero or exceeds [`MAX_SLOTS`].
    pub fn new(data: T, slots: usize) -> Result<Self, AndersonError> {
        if slots == 0 {
            return Err(AndersonError::ZeroSlots);
        }
        if slots > MAX_SLOTS {
            return Err(AndersonError::TooManySlots { requested: slots });
        }

        let mut flags = Vec::with_capacity(slots);
        // Slot 0 starts "available"; every other slot starts closed so a
        // waiter assigned to it blocks until its predecessor releases.
        flags.push(CacheAligned::new(AtomicU32::new(1)));
        for _ in 1..slots {
            flags.push(CacheAligned::new(AtomicU32::new(0)));
        }

        Ok(Self {
            next_slot: AtomicU32::new(0),
            serving_slot: AtomicU32::new(0),
            slots,
            flags,
            data: UnsafeCell::new(data),
        })
    }

    /// The configured slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots
    }

    /// Acquires the lock, busy-waiting with a pause hint if necessary.
    pub fn lock(&self) -> AndersonGuard<'_, T> {
        let my_slot = word32::fetch_add(&self.next_slot, 1) as usize % self.slots;

        while word32::load_acquire(&self.flags[my_slot].0) == 0 {
            crate::pr::pause();
        }
        word32::store_release(&self.flags[my_slot].0, 0);

        AndersonGuard {
            lock: self,
            slot: my_slot,
        }
    }
}

unsafe impl<T: Send> Send for AndersonLock<T> {}
unsafe impl<T: Send> Sync for AndersonLock<T> {}

/// RAII guard for [`AndersonLock`]. Releases the slot to the next waiter
/// on drop.
pub struct AndersonGuard<'a, T: ?Sized> {
    lock: &'a AndersonLock<T>,
    slot: usize,
}

impl<T: ?Sized> Deref for AndersonGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for AndersonGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for AndersonGuard<'_, T> {
    fn drop(&mut self) {
        debug_assert_eq!(
            self.slot,
            word32::load(&self.lock.serving_slot) as usize % self.lock.slots
        );
        let next = (self.slot + 1) % self.lock.slots;
        word32::store(&self.lock.serving_slot, next as u32);
        word32::store_release(&self.lock.flags[next].0, 1);
    }
}

//! Single-word spinlocks: test-and-set, test-and-test-and-set, and ticket.
//!
//! - [`TasLock`] - test-and-set spinlock (unfair but fast)
//! - [`TatasLock`] - test-and-test-and-set spinlock (unfair, cheaper under contention)
//! - [`TicketLock`] - FIFO-ordered spinlock
//!
//! None of `TasLock`/`TatasLock` make any fairness guarantee; a thread can
//! be starved indefinitely under contention. `TicketLock` is strictly FIFO.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::AtomicU32;

use crate::backoff::Backoff;
use crate::cc::{likely, unlikely};
use crate::pr::word32;

/// A test-and-set spinlock.
///
/// `lock` repeats `xchg(&locked, 1)` until the returned value is 0. This is
/// the simplest and fastest spinlock under low contention, but every failed
/// attempt is itself a write that every other spinning core must observe,
/// so it degrades badly under contention relative to [`TatasLock`].
#[repr(C)]
pub struct TasLock<T: ?Sized> {
    locked: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> TasLock<T> {
    const UNLOCKED: u32 = 0;
    const LOCKED: u32 = 1;

    /// Creates a new unlocked spinlock.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicU32::new(Self::UNLOCKED),
            data: UnsafeCell::new(data),
        }
    }

    /// Attempts to acquire the lock without spinning.
    #[inline]
    pub fn try_lock(&self) -> Option<TasLockGuard<'_, T>> {
        let old = word32::xchg(&self.locked, Self::LOCKED);
        if likely(old == Self::UNLOCKED) {
            Some(TasLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Acquires the lock, busy-waiting with backoff if necessary.
    #[inline]
    pub fn lock(&self) -> TasLockGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            let old = word32::xchg(&self.locked, Self::LOCKED);
            if likely(old == Self::UNLOCKED) {
                return TasLockGuard { lock: self };
            }
            backoff.spin();
        }
    }

    /// Returns whether the lock currently appears held.
    ///
    /// Advisory only: the result may be stale by the time it is observed.
    #[inline]
    pub fn is_locked(&self) -> bool {
        word32::load(&self.locked) == Self::LOCKED
    }
}

unsafe impl<T: Send> Send for TasLock<T> {}
unsafe impl<T: Send> Sync for TasLock<T> {}

/// RAII guard for [`TasLock`]. Releases on drop.
pub struct TasLockGuard<'a, T: ?Sized> {
    lock: &'a TasLock<T>,
}

impl<T: ?Sized> Deref for TasLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for TasLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for TasLockGuard<'_, T> {
    fn drop(&mut self) {
        word32::store_release(&self.lock.locked, TasLock::<T>::UNLOCKED);
    }
}

/// A test-and-test-and-set spinlock.
///
/// Identical correctness to [`TasLock`], but the contended path first spins
/// on a relaxed *read* of `locked` before ever attempting the exchange.
/// Reads are shared by every core's cache under MESI-style coherence, while
/// the exchange requires exclusive ownership of the cache line; checking
/// first before every retry keeps a crowd of waiters from constantly
/// invalidating each other's copy of the line.
#[repr(C)]
pub struct TatasLock<T: ?Sized> {
    locked: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> TatasLock<T> {
    const UNLOCKED: u32 = 0;
    const LOCKED: u32 = 1;

    /// Creates a new unlocked spinlock.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicU32::new(Self::UNLOCKED),
            data: UnsafeCell::new(data),
        }
    }

    /// Attempts to acquire the lock without spinning.
    #[inline]
    pub fn try_lock(&self) -> Option<TatasLockGuard<'_, T>> {
        if unlikely(word32::load(&self.locked) != Self::UNLOCKED) {
            return None;
        }
        let old = word32::xchg(&self.locked, Self::LOCKED);
        if likely(old == Self::UNLOCKED) {
            Some(TatasLockGuard { lock: self })
        } else {
            None
        }
    }

    /// Acquires the lock, busy-waiting with a pause hint if necessary.
    #[inline]
    pub fn lock(&self) -> TatasLockGuard<'_, T> {
        let mut backoff = Backoff::new();
        loop {
            if likely(word32::load(&self.locked) == Self::UNLOCKED) {
                let old = word32::xchg(&self.locked, Self::LOCKED);
                if likely(old == Self::UNLOCKED) {
                    return TatasLockGuard { lock: self };
                }
            }
            backoff.spin();
        }
    }

    /// Returns whether the lock currently appears held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        word32::load(&self.locked) == Self::LOCKED
    }
}

unsafe impl<T: Send> Send for TatasLock<T> {}
unsafe impl<T: Send> Sync for TatasLock<T> {}

/// RAII guard for [`TatasLock`]. Releases on drop.
pub struct TatasLockGuard<'a, T: ?Sized> {
    lock: &'a TatasLock<T>,
}

impl<T: ?Sized> Deref for TatasLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for TatasLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for TatasLockGuard<'_, T> {
    fn drop(&mut self) {
        word32::store_release(&self.lock.locked, TatasLock::<T>::UNLOCKED);
    }
}

/// A ticket lock with strict FIFO fairness.
///
/// Each caller draws a ticket with `fetch_add` on `next_ticket` and spins
/// until `serving` reaches it. Unlike [`TasLock`]/[`TatasLock`], no waiter
/// can be starved: service order is exactly arrival order.
#[repr(C)]
pub struct TicketLock<T: ?Sized> {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T> TicketLock<T> {
    /// Creates a new unlocked ticket lock.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Attempts to acquire the lock without spinning.
    ///
    /// Fails immediately if the lock is contended (another ticket is
    /// already outstanding), rather than drawing a ticket and waiting.
    #[inline]
    pub fn try_lock(&self) -> Option<TicketLockGuard<'_, T>> {
        let ticket = word32::load(&self.next_ticket);
        let serving = word32::load_acquire(&self.now_serving);
        if unlikely(ticket != serving) {
            return None;
        }

        let (_, won) = word32::cmpxchg(&self.next_ticket, ticket, ticket + 1);
        if !won {
            return None;
        }

        if unlikely(word32::load_acquire(&self.now_serving) != ticket) {
            // Handed off between our check and our CAS; we already hold
            // ticket `ticket` and must honor it rather than report failure
            // after having mutated shared state.
            let mut backoff = Backoff::new();
            while word32::load_acquire(&self.now_serving) != ticket {
                backoff.spin();
            }
        }

        Some(TicketLockGuard { lock: self })
    }

    /// Acquires the lock, busy-waiting with a pause hint if necessary.
    #[inline]
    pub fn lock(&self) -> TicketLockGuard<'_, T> {
        let ticket = word32::fetch_add(&self.next_ticket, 1);
        let mut backoff = Backoff::new();

        while word32::load_acquire(&self.now_serving) != ticket {
            backoff.spin();
        }

        TicketLockGuard { lock: self }
    }

    /// Returns whether the lock currently appears held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        word32::load(&self.next_ticket) != word32::load(&self.now_serving)
    }
}

unsafe impl<T: Send> Send for TicketLock<T> {}
unsafe impl<T: Send> Sync for TicketLock<T> {}

/// RAII guard for [`TicketLock`]. Releases on drop.
pub struct TicketLockGuard<'a, T: ?Sized> {
    lock: &'a TicketLock<T>,
}

impl<T: ?Sized> Deref for TicketLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for TicketLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for TicketLockGuard<'_, T> {
    fn drop(&mut self) {
        let serving = word32::load(&self.lock.now_serving);
        word32::store_release(&self.lock.now_serving, serving + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tas_lock_unlock() {
        let lock = TasLock::new(42);
        assert!(!lock.is_locked());
        {
            let guard = lock.lock();
            assert!(lock.is_locked());
            assert_eq!(*guard, 42);
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn tas_try_lock_then_contended() {
        let lock = TasLock::new(0);
        let g1 = lock.try_lock();
        assert!(g1.is_some());
        assert!(lock.try_lock().is_none());
        drop(g1);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn tatas_lock_unlock() {
        let lock = TatasLock::new(7);
        {
            let mut guard = lock.lock();
            *guard = 9;
        }
        assert_eq!(*lock.lock(), 9);
    }

    #[test]
    fn tatas_try_lock_then_contended() {
        let lock = TatasLock::new(0);
        let g1 = lock.try_lock().unwrap();
        assert!(lock.try_lock().is_none());
        drop(g1);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn ticket_lock_unlock() {
        let lock = TicketLock::new(0);
        {
            let mut guard = lock.lock();
            *guard = 1;
        }
        assert_eq!(*lock.lock(), 1);
    }

    #[test]
    fn ticket_try_lock_then_contended_then_free() {
        let lock = TicketLock::new(42);
        let guard = lock.try_lock();
        assert!(guard.is_some());
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn ticket_is_locked_tracks_outstanding_tickets() {
        let lock = TicketLock::new(0);
        assert!(!lock.is_locked());
        let guard = lock.lock();
        assert!(lock.is_locked());
        drop(guard);
        assert!(!lock.is_locked());
    }
}

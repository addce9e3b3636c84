//! # concurrencykit
//!
//! Portable mutual-exclusion primitives built on a small atomics substrate:
//! single-word spinlocks, a FIFO ticket lock, three queue-based locks
//! (Anderson array, MCS, CLH), and two reader-writer locks (writer-preferring
//! and phase-fair).
//!
//! ## Module organization
//!
//! ### Foundation
//! - [`cc`] - branch prediction hints
//! - [`malloc`] - memory allocator abstraction
//! - [`cacheline`] - cache-line padding for independently-contended words
//!
//! ### Core primitives
//! - [`pr`] - atomic primitives and memory barriers
//! - [`backoff`] - exponential backoff for contention management, emitting a
//!   `log::trace!` point on the first spin of each contended acquisition
//!

//! ### Locks
//! - [`spinlock`] - test-and-set, test-and-test-and-set, and ticket locks
//! - [`anderson`] - Anderson array-based queueing lock
//! - [`mcs`] - MCS queue lock
//! - [`clh`] - CLH queue lock
//! - [`rwlock`] - writer-preferring reader-writer lock
//! - [`pflock`] - phase-fair reader-writer lock
//!
//! None of these locks park or sleep a blocked thread; a caller waiting on
//! any of them busy-spins with backoff until it observes the lock free.
//! There is no recursive acquisition, no priority inheritance, and no
//! condition-variable-style wait/notify — see each module's documentation
//! for the exact contract it does provide.

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_inception)]

extern crate alloc;

// =============================================================================
// Tier 0: Foundation (No Internal Dependencies)
// =============================================================================

/// Branch prediction hints.
pub mod cc;

/// Memory allocator abstraction.
///
/// Defines the [`Allocator`](malloc::Allocator) trait for custom memory allocation.
pub mod malloc;

/// Cache-line padding for independently-contended atomic words.
pub mod cacheline;

// =============================================================================
// Tier 1: Core Primitives (Depends on Tier 0)
// =============================================================================

/// Atomic primitives and memory barriers.
///
/// Provides atomic operations with per-operation memory orderings.
pub mod pr;

/// Exponential backoff for contention management.
pub mod backoff;

// =============================================================================
// Tier 2: Locks (Depends on Tiers 0-1)
// =============================================================================

/// Test-and-set, test-and-test-and-set, and ticket spinlocks.
pub mod spinlock;

/// Anderson array-based queueing lock.
pub mod anderson;

/// MCS queue lock.
pub mod mcs;

/// CLH queue lock.
pub mod clh;

/// Writer-preferring reader-writer lock.
pub mod rwlock;

/// Phase-fair reader-writer lock.
pub mod pflock;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use cc::{likely, unlikely};
pub use malloc::Allocator;

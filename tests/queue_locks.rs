//! Multi-threaded invariants for the queue-based locks: Anderson, MCS, CLH.

use std::sync::Arc;
use std::thread;

use concurrencykit::anderson::AndersonLock;
use concurrencykit::clh::{ClhLock, ClhNode};
use concurrencykit::mcs::{McsLock, McsNode};

#[test]
fn anderson_bound_four_slots_four_threads() {
    let lock = Arc::new(AndersonLock::new(0u64, 4).unwrap());
    let threads = 4;
    let iters = 100_000u64;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                for _ in 0..iters {
                    let mut guard = lock.lock();
                    *guard += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(*lock.lock(), threads as u64 * iters);
}

#[test]
fn mcs_counter_survives_eight_threads_times_100000() {
    let lock = Arc::new(McsLock::new(0u64));
    let threads = 8;
    let iters = 100_000u64;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let node = McsNode::new();
                for _ in 0..iters {
                    let mut guard = lock.lock(&node);
                    *guard += 1;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(*lock.lock(&McsNode::new()), threads as u64 * iters);
}

#[test]
fn clh_counter_with_node_handoff_across_threads() {
    let lock = Arc::new(ClhLock::try_new(0u64).unwrap());
    let threads = 4;
    let iters = 5_000u64;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let mut node = ClhNode::new_boxed();
                for _ in 0..iters {
                    let mut guard = lock.lock(node);
                    *guard += 1;
                    node = guard.unlock().unwrap_or_else(ClhNode::new_boxed);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let guard = lock.lock(ClhNode::new_boxed());
    assert_eq!(*guard, threads as u64 * iters);
}

#[test]
fn mcs_hands_off_to_waiters_in_arrival_order() {
    let lock = Arc::new(McsLock::new(()));
    let entry_log = Arc::new(std::sync::Mutex::new(Vec::new()));

    let holder_node = McsNode::new();
    let holder_guard = lock.lock(&holder_node);

    // Each waiter is spawned, and given time to join the queue, strictly
    // before the next one — so arrival order is exactly spawn order.
    let mut handles = Vec::new();
    for id in 0..4 {
        let lock = Arc::clone(&lock);
        let entry_log = Arc::clone(&entry_log);
        handles.push(thread::spawn(move || {
            let node = McsNode::new();
            let _guard = lock.lock(&node);
            entry_log.lock().unwrap().push(id);
        }));
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    drop(holder_guard);
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(*entry_log.lock().unwrap(), vec![0, 1, 2, 3]);
}

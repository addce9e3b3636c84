//! End-to-end reproduction of the atomics self-test sequence from outside
//! the crate, exercising the same substrate every lock in this crate is
//! built on.

use concurrencykit::pr::word32;
use core::sync::atomic::AtomicU32;

#[test]
fn self_test_sequence_matches_expected_trace() {
    let v = AtomicU32::new(0);

    word32::store(&v, 42);
    assert_eq!(word32::load(&v), 42);

    assert_eq!(word32::xchg(&v, 100), 42);
    assert_eq!(word32::cmpxchg(&v, 100, 200), (100, true));
    assert_eq!(word32::cmpxchg(&v, 100, 300), (200, false));
    assert_eq!(word32::load(&v), 200);

    assert_eq!(word32::fetch_add(&v, 50), 200);
    assert_eq!(word32::fetch_sub(&v, 30), 250);
    assert_eq!(word32::load(&v), 220);

    assert_eq!(word32::fetch_add(&v, 1), 220);
    assert_eq!(word32::fetch_sub(&v, 1), 221);
    assert_eq!(word32::load(&v), 220);

    assert_eq!(word32::fetch_and(&v, 0xF0), 220);
    assert_eq!(word32::fetch_or(&v, 0x0F), 208);
    assert_eq!(word32::load(&v), 223);
}

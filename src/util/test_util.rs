// Some helpers are only used by a subset of the test modules.
#![allow(dead_code)]

use crate::util::constants::BYTES_IN_MBYTE;
use crate::util::options::Options;
use crate::util::Address;
use std::panic;
use std::sync::Mutex;

/// Heap base used by the tests. Aligned to the largest grain size.
pub const TEST_HEAP_BASE: Address = unsafe { Address::from_usize(0x4000_0000) };
/// Grain size used by the tests.
pub const TEST_GRAIN_BYTES: usize = BYTES_IN_MBYTE;

lazy_static::lazy_static! {
    static ref SERIAL_TEST_LOCK: Mutex<()> = Mutex::default();
}

// force some tests to be executed serially
pub fn serial_test<F>(f: F)
where
    F: FnOnce(),
{
    let _lock = SERIAL_TEST_LOCK.lock();
    f();
}

// Always execute a cleanup closure no matter the test panics or not.
pub fn with_cleanup<T, C>(test: T, cleanup: C)
where
    T: FnOnce() + panic::UnwindSafe,
    C: FnOnce(),
{
    let res = panic::catch_unwind(test);
    cleanup();
    if let Err(e) = res {
        panic::resume_unwind(e);
    }
}

/// Options for a small heap: 1 MiB regions, `initial` committed out of `max` reserved.
/// Environment variables are not consulted.
pub fn small_heap_options(initial: usize, max: usize) -> Options {
    Options {
        heap_base: TEST_HEAP_BASE,
        grain_bytes: TEST_GRAIN_BYTES,
        initial_regions: initial,
        max_regions: max,
        expand_on_humongous: true,
        verify_monitoring: true,
    }
}

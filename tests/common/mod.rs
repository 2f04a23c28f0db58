// Not every test crate uses every helper.
#![allow(dead_code)]

use g1_regions::region::HeapRegionManager;
use g1_regions::util::options::Options;
use g1_regions::util::Address;

pub const MB: usize = 1 << 20;

pub const HEAP_BASE: Address = unsafe { Address::from_usize(0x4000_0000) };

pub fn manager(length: usize) -> HeapRegionManager {
    HeapRegionManager::with_committed(HEAP_BASE, MB, length, 64).unwrap()
}

pub fn options(initial: usize, max: usize) -> Options {
    Options {
        heap_base: HEAP_BASE,
        grain_bytes: MB,
        initial_regions: initial,
        max_regions: max,
        expand_on_humongous: true,
        verify_monitoring: true,
    }
}

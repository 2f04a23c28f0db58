//! Read-only views of the heap for inspection clients.
//!
//! Both traits are object safe, so a tool can walk a heap without knowing its concrete type.
//! Nothing reachable through them mutates the heap.

use crate::g1_heap::G1CollectedHeap;
use crate::region::HeapRegion;
use crate::util::Address;

pub trait HeapInspector {
    fn name(&self) -> &str;
    /// The committed regions, in address order.
    fn list_regions(&self) -> Vec<&dyn RegionInspector>;
}

pub trait RegionInspector {
    fn region_type(&self) -> &str;
    fn start(&self) -> Address;
    fn size(&self) -> usize;
    fn used(&self) -> usize;
    /// The short type tag, as printed in region listings.
    fn annotation(&self) -> String;
}

impl HeapInspector for G1CollectedHeap {
    fn name(&self) -> &str {
        "G1"
    }

    fn list_regions(&self) -> Vec<&dyn RegionInspector> {
        self.heap_region_iter()
            .map(|r| r as &dyn RegionInspector)
            .collect()
    }
}

impl RegionInspector for HeapRegion {
    fn region_type(&self) -> &str {
        let name: &'static str = self.kind().state().into();
        name
    }

    fn start(&self) -> Address {
        self.bottom()
    }

    fn size(&self) -> usize {
        self.capacity()
    }

    fn used(&self) -> usize {
        HeapRegion::used(self)
    }

    fn annotation(&self) -> String {
        self.kind().annotation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionType;
    use crate::util::constants::BYTES_IN_MBYTE;
    use crate::util::test_util::{small_heap_options, TEST_HEAP_BASE};

    #[test]
    fn lists_committed_regions() {
        let mut heap = G1CollectedHeap::new(&small_heap_options(3, 8)).unwrap();
        heap.reclassify(1, RegionType::ARCHIVE).unwrap();
        heap.manager().allocate(1, 128).unwrap();

        let inspector: &dyn HeapInspector = &heap;
        assert_eq!(inspector.name(), "G1");
        let regions = inspector.list_regions();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].start(), TEST_HEAP_BASE);
        assert_eq!(regions[1].start(), TEST_HEAP_BASE + BYTES_IN_MBYTE);
        assert_eq!(regions[1].size(), BYTES_IN_MBYTE);
        assert_eq!(regions[1].used(), 128);
        assert_eq!(regions[1].region_type(), "Old");
        assert_eq!(regions[1].annotation(), "OA");
        assert_eq!(regions[2].region_type(), "Free");
    }

    #[test]
    fn uncommitted_regions_are_not_listed() {
        let mut heap = G1CollectedHeap::new(&small_heap_options(4, 8)).unwrap();
        assert_eq!(heap.shrink_by(2), 2);
        assert_eq!(heap.list_regions().len(), 2);
    }
}

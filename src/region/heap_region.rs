use super::RegionType;
use crate::error::{RegionError, RegionResult};
use crate::util::Address;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One fixed-size slice of the reserved heap.
///
/// A region owns its allocation cursor (`top`), its classification and its bounds.
/// `bottom <= top <= end` always holds, and `end - bottom` is the grain size.
///
/// `top` is atomic so that the allocating thread that holds the region's claim (see
/// [`crate::region::HeapRegionManager::claim_alloc_region`]) can bump it through a shared
/// reference. Everything else is only changed through `&mut` access, i.e. by the single
/// collector thread that owns the manager.
#[derive(Debug)]
pub struct HeapRegion {
    index: usize,
    bottom: Address,
    end: Address,
    top: AtomicUsize,
    kind: RegionType,
    committed: bool,
    /// For a ContinuesHumongous region, the index of the StartsHumongous region of the span.
    humongous_start: Option<usize>,
    claimed: AtomicBool,
}

impl HeapRegion {
    pub(crate) fn new(index: usize, bottom: Address, grain_bytes: usize) -> Self {
        debug_assert!(bottom.is_aligned_to(grain_bytes));
        HeapRegion {
            index,
            bottom,
            end: bottom + grain_bytes,
            top: AtomicUsize::new(bottom.as_usize()),
            kind: RegionType::FREE,
            committed: true,
            humongous_start: None,
            claimed: AtomicBool::new(false),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bottom(&self) -> Address {
        self.bottom
    }

    pub fn top(&self) -> Address {
        unsafe { Address::from_usize(self.top.load(Ordering::Acquire)) }
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn kind(&self) -> RegionType {
        self.kind
    }

    /// Size of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.end - self.bottom
    }

    pub fn used(&self) -> usize {
        self.top() - self.bottom
    }

    pub fn free(&self) -> usize {
        self.end - self.top()
    }

    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.bottom <= addr && addr < self.end
    }

    /// False once the region has been logically uncommitted by a heap shrink.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// The StartsHumongous region of the span this region belongs to, if it is humongous.
    pub fn humongous_start_region(&self) -> Option<usize> {
        if self.kind.is_starts_humongous() {
            Some(self.index)
        } else {
            self.humongous_start
        }
    }

    pub fn is_free(&self) -> bool {
        self.kind.is_free()
    }

    pub fn is_eden(&self) -> bool {
        self.kind.is_eden()
    }

    pub fn is_survivor(&self) -> bool {
        self.kind.is_survivor()
    }

    pub fn is_young(&self) -> bool {
        self.kind.is_young()
    }

    pub fn is_humongous(&self) -> bool {
        self.kind.is_humongous()
    }

    pub fn is_starts_humongous(&self) -> bool {
        self.kind.is_starts_humongous()
    }

    pub fn is_continues_humongous(&self) -> bool {
        self.kind.is_continues_humongous()
    }

    pub fn is_old(&self) -> bool {
        self.kind.is_old()
    }

    pub fn is_old_or_humongous(&self) -> bool {
        self.kind.is_old_or_humongous()
    }

    pub fn is_pinned(&self) -> bool {
        self.kind.is_pinned()
    }

    pub fn is_archive(&self) -> bool {
        self.kind.is_archive()
    }

    /// Bump-allocate `bytes` from `top` on behalf of an owner that has not claimed the region.
    /// Returns the start of the allocated cell. Fails with `AlreadyClaimed` while another owner
    /// holds the region through [`crate::region::AllocRegion`].
    pub fn allocate(&self, bytes: usize) -> RegionResult<Address> {
        if self.is_claimed() {
            return Err(RegionError::AlreadyClaimed(self.index));
        }
        self.bump(bytes)
    }

    /// The CAS bump itself. Only the claim holder calls this directly.
    pub(crate) fn bump(&self, bytes: usize) -> RegionResult<Address> {
        let end = self.end.as_usize();
        let mut old = self.top.load(Ordering::Relaxed);
        loop {
            let new = match old.checked_add(bytes) {
                Some(new) if new <= end => new,
                _ => {
                    return Err(RegionError::OutOfRegion {
                        index: self.index,
                        requested: bytes,
                        free: end - old,
                    })
                }
            };
            match self
                .top
                .compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Ok(unsafe { Address::from_usize(old) }),
                Err(current) => old = current,
            }
        }
    }

    /// Reclaim the region: `top = bottom`, classification `Free`. Any claim left behind by a
    /// leaked guard is dropped too; `&mut self` means no guard can still be alive.
    pub(crate) fn reset(&mut self) {
        *self.top.get_mut() = self.bottom.as_usize();
        *self.claimed.get_mut() = false;
        self.kind = RegionType::FREE;
        self.humongous_start = None;
    }

    pub(crate) fn set_kind(&mut self, kind: RegionType) {
        self.kind = kind;
    }

    pub(crate) fn set_top(&mut self, top: Address) {
        debug_assert!(self.bottom <= top && top <= self.end);
        *self.top.get_mut() = top.as_usize();
    }

    pub(crate) fn set_humongous_start(&mut self, start: Option<usize>) {
        self.humongous_start = start;
    }

    pub(crate) fn set_committed(&mut self, committed: bool) {
        self.committed = committed;
    }

    pub(crate) fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    pub(crate) fn release_claim(&self) {
        let _was_claimed = self.claimed.swap(false, Ordering::AcqRel);
        debug_assert!(_was_claimed);
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

/// One line per region: index, bounds, occupancy and type annotation.
impl fmt::Display for HeapRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let percent = self.used() * 100 / self.capacity();
        write!(
            f,
            "|{:5}|{}, {}, {}|{:3}%|{:>3}|",
            self.index,
            self.bottom,
            self.top(),
            self.end,
            percent,
            self.kind.annotation()
        )?;
        if let Some(start) = self.humongous_start {
            write!(f, " start {}", start)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::BYTES_IN_MBYTE;
    use crate::util::test_util::TEST_HEAP_BASE;

    fn region() -> HeapRegion {
        HeapRegion::new(0, TEST_HEAP_BASE, BYTES_IN_MBYTE)
    }

    #[test]
    fn new_region_is_free_and_empty() {
        let r = region();
        assert!(r.is_free());
        assert_eq!(r.used(), 0);
        assert_eq!(r.free(), BYTES_IN_MBYTE);
        assert_eq!(r.end() - r.bottom(), BYTES_IN_MBYTE);
    }

    #[test]
    fn bump_allocation() {
        let r = region();
        let a = r.allocate(16).unwrap();
        let b = r.allocate(32).unwrap();
        assert_eq!(a, r.bottom());
        assert_eq!(b, r.bottom() + 16usize);
        assert_eq!(r.used(), 48);
        assert!(r.bottom() <= r.top() && r.top() <= r.end());
    }

    #[test]
    fn allocate_exactly_full() {
        let r = region();
        r.allocate(BYTES_IN_MBYTE).unwrap();
        assert_eq!(r.free(), 0);
        assert_eq!(
            r.allocate(1),
            Err(RegionError::OutOfRegion {
                index: 0,
                requested: 1,
                free: 0
            })
        );
        // A failed allocation does not move top.
        assert_eq!(r.top(), r.end());
    }

    #[test]
    fn oversized_request_does_not_overflow() {
        let r = region();
        assert!(r.allocate(usize::MAX).is_err());
        assert_eq!(r.used(), 0);
    }

    #[test]
    fn reset_reclaims() {
        let mut r = region();
        r.set_kind(RegionType::OLD);
        r.allocate(100).unwrap();
        r.reset();
        assert!(r.is_free());
        assert_eq!(r.top(), r.bottom());
    }

    #[test]
    fn claim_is_exclusive() {
        let r = region();
        assert!(r.try_claim());
        assert!(!r.try_claim());
        r.release_claim();
        assert!(r.try_claim());
    }

    #[test]
    fn claimed_region_refuses_unclaimed_allocation() {
        let r = region();
        assert!(r.try_claim());
        assert_eq!(r.allocate(64), Err(RegionError::AlreadyClaimed(0)));
        assert_eq!(r.bump(64).unwrap(), r.bottom());
        r.release_claim();
        assert_eq!(r.allocate(64).unwrap(), r.bottom() + 64usize);
    }

    #[test]
    fn reset_drops_a_stale_claim() {
        let mut r = region();
        r.set_kind(RegionType::EDEN);
        assert!(r.try_claim());
        r.reset();
        assert!(!r.is_claimed());
        assert!(r.try_claim());
    }

    #[test]
    fn display_line() {
        let r = region();
        r.allocate(BYTES_IN_MBYTE / 2).unwrap();
        let line = r.to_string();
        assert!(line.starts_with("|    0|0x40000000, 0x40080000, 0x40100000| 50%|  F|"), "{}", line);
    }
}

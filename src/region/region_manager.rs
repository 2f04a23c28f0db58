use super::{HeapRegion, HeapRegionSet, HeapRegionTable, RegionSetKind, RegionState, RegionType};
use crate::error::{RegionError, RegionResult};
use crate::util::conversions;
use crate::util::Address;
use itertools::Itertools;
use strum::IntoEnumIterator;

/// Owns the region table and the old/archive/humongous sets, and is the only place where a
/// region's classification changes.
///
/// The committed regions always form a prefix of the table: `expand_by` re-commits slots that a
/// previous `shrink_by` marked uncommitted before it appends new slots, and `shrink_by` only
/// uncommits trailing free regions.
///
/// Mutation goes through `&mut self`, so classification changes are serialized by whoever owns
/// the manager (the collector, at a safepoint). Bump allocation in a claimed region goes through
/// `&self` and [`AllocRegion`].
#[derive(Debug)]
pub struct HeapRegionManager {
    table: HeapRegionTable,
    committed_length: usize,
    old_set: HeapRegionSet,
    archive_set: HeapRegionSet,
    humongous_set: HeapRegionSet,
}

impl HeapRegionManager {
    /// Create a manager with an empty table. Use [`HeapRegionManager::expand_by`] to commit regions.
    pub fn new(heap_base: Address, grain_bytes: usize, max_length: usize) -> RegionResult<Self> {
        let table = HeapRegionTable::new(heap_base, grain_bytes, max_length)?;
        Ok(HeapRegionManager {
            table,
            committed_length: 0,
            old_set: HeapRegionSet::new(RegionSetKind::Old, max_length),
            archive_set: HeapRegionSet::new(RegionSetKind::Archive, max_length),
            humongous_set: HeapRegionSet::new(RegionSetKind::Humongous, max_length),
        })
    }

    /// Create a manager and commit `length` regions.
    pub fn with_committed(
        heap_base: Address,
        grain_bytes: usize,
        length: usize,
        max_length: usize,
    ) -> RegionResult<Self> {
        let mut manager = Self::new(heap_base, grain_bytes, max_length)?;
        if length > 0 {
            manager.expand_by(length)?;
        }
        Ok(manager)
    }

    /// The number of committed regions.
    pub fn length(&self) -> usize {
        self.committed_length
    }

    pub fn max_length(&self) -> usize {
        self.table.max_length()
    }

    /// The committed size in bytes.
    pub fn capacity(&self) -> usize {
        conversions::regions_to_bytes(self.committed_length, self.table.log_grain_bytes())
    }

    pub fn grain_bytes(&self) -> usize {
        self.table.grain_bytes()
    }

    pub fn heap_base(&self) -> Address {
        self.table.heap_base()
    }

    pub fn table(&self) -> &HeapRegionTable {
        &self.table
    }

    /// The region at `index`, including slots that are currently uncommitted.
    pub fn at(&self, index: usize) -> RegionResult<&HeapRegion> {
        self.table.at(index)
    }

    /// The committed region that covers `addr`.
    pub fn get_by_address(&self, addr: Address) -> RegionResult<&HeapRegion> {
        let region = self.table.region_for_address(addr)?;
        if region.is_committed() {
            Ok(region)
        } else {
            Err(RegionError::AddressNotInHeap(addr))
        }
    }

    /// A fresh iterator over the committed regions in index order.
    pub fn heap_region_iter(&self) -> HeapRegionIterator<'_> {
        HeapRegionIterator {
            inner: self.table.iter(),
        }
    }

    /// Apply `closure` to every committed region in index order. The closure returns `true` to
    /// abort the iteration. Returns `true` if the iteration was aborted.
    pub fn heap_region_iterate<F>(&self, mut closure: F) -> bool
    where
        F: FnMut(&HeapRegion) -> bool,
    {
        for region in self.heap_region_iter() {
            if closure(region) {
                return true;
            }
        }
        false
    }

    /// Apply `visitor` to every committed region that has `used() > 0`, in index order.
    pub fn live_regions_iterate<F>(&self, mut visitor: F)
    where
        F: FnMut(&HeapRegion),
    {
        self.heap_region_iter()
            .filter(|r| r.used() > 0)
            .for_each(|r| visitor(r));
    }

    pub fn old_set(&self) -> &HeapRegionSet {
        &self.old_set
    }

    pub fn archive_set(&self) -> &HeapRegionSet {
        &self.archive_set
    }

    pub fn humongous_set(&self) -> &HeapRegionSet {
        &self.humongous_set
    }

    pub fn set(&self, kind: RegionSetKind) -> &HeapRegionSet {
        match kind {
            RegionSetKind::Old => &self.old_set,
            RegionSetKind::Archive => &self.archive_set,
            RegionSetKind::Humongous => &self.humongous_set,
        }
    }

    fn set_mut(&mut self, kind: RegionSetKind) -> &mut HeapRegionSet {
        match kind {
            RegionSetKind::Old => &mut self.old_set,
            RegionSetKind::Archive => &mut self.archive_set,
            RegionSetKind::Humongous => &mut self.humongous_set,
        }
    }

    /// Is the region after `index` a ContinuesHumongous region of the same span?
    fn has_humongous_continuation(&self, index: usize) -> bool {
        let start = match self.table.at(index).ok().and_then(|r| r.humongous_start_region()) {
            Some(start) => start,
            None => return false,
        };
        self.table
            .at(index + 1)
            .is_ok_and(|next| next.is_continues_humongous() && next.humongous_start_region() == Some(start))
    }

    fn is_legal_transition(&self, index: usize, from: RegionType, to: RegionType) -> bool {
        use RegionState::*;

        if from == to || !to.is_well_formed() {
            return false;
        }
        match (from.state(), to.state()) {
            // Spans are freed tail-first, so a humongous region never loses its continuation.
            (_, Free) => !self.has_humongous_continuation(index),
            (Free, Eden | Survivor | Old | StartsHumongous) => true,
            (Free, ContinuesHumongous) => index
                .checked_sub(1)
                .and_then(|prev| self.table.at(prev).ok())
                .is_some_and(|prev| prev.is_committed() && prev.is_humongous()),
            // Promotion in place.
            (Eden, Survivor | Old) | (Survivor, Old) => true,
            // Only the Pinned/Archive flags change.
            (a, b) if a == b => a.accepts_flags(),
            _ => false,
        }
    }

    /// Change the classification of region `index` to `kind`, keeping the region sets in step.
    ///
    /// The transition and the set membership are validated before anything is changed, so on
    /// error neither the region nor any set has been modified. Reclassifying to `Free` resets
    /// the region.
    pub fn reclassify(&mut self, index: usize, kind: RegionType) -> RegionResult<()> {
        let region = self.table.at(index)?;
        let from = region.kind();
        if !region.is_committed() || !self.is_legal_transition(index, from, kind) {
            debug!("Refused to reclassify region {} from {} to {}", index, from, kind);
            return Err(RegionError::InconsistentClassification {
                index,
                from,
                to: kind,
            });
        }

        let old_set = RegionSetKind::for_type(from);
        let new_set = RegionSetKind::for_type(kind);
        if old_set != new_set {
            if let Some(set) = old_set {
                if !self.set(set).contains(index) {
                    return Err(RegionError::NotMember { set, index });
                }
            }
            if let Some(set) = new_set {
                if self.set(set).contains(index) {
                    return Err(RegionError::AlreadyMember { set, index });
                }
            }
        }

        let humongous_start = if kind.is_continues_humongous() && !from.is_continues_humongous() {
            self.table.at(index - 1)?.humongous_start_region()
        } else {
            None
        };

        if old_set != new_set {
            if let Some(set) = old_set {
                self.set_mut(set).remove(index)?;
            }
            if let Some(set) = new_set {
                self.set_mut(set).add(index)?;
            }
        }

        let region = self.table.at_mut(index)?;
        if kind.is_free() {
            region.reset();
        } else {
            region.set_kind(kind);
            if humongous_start.is_some() {
                region.set_humongous_start(humongous_start);
            }
        }
        trace!("Region {} reclassified from {} to {}", index, from, kind);

        #[cfg(feature = "extreme_assertions")]
        self.verify()?;

        Ok(())
    }

    /// Reclaim region `index`: reset its cursor and classify it `Free`.
    pub fn free_region(&mut self, index: usize) -> RegionResult<()> {
        self.reclassify(index, RegionType::FREE)
    }

    fn check_allocatable(region: &HeapRegion) -> RegionResult<()> {
        let kind = region.kind();
        if !region.is_committed() || kind.is_free() || kind.is_humongous() {
            return Err(RegionError::NotAllocatable {
                index: region.index(),
                kind,
            });
        }
        Ok(())
    }

    /// Bump-allocate `bytes` in region `index`. The region must be committed, be an eden,
    /// survivor or old region, and not be claimed by an [`AllocRegion`] (`AlreadyClaimed`).
    pub fn allocate(&self, index: usize, bytes: usize) -> RegionResult<Address> {
        let region = self.table.at(index)?;
        Self::check_allocatable(region)?;
        region.allocate(bytes)
    }

    /// Hand region `index` to one allocating owner. The region stays claimed until the returned
    /// guard is dropped; a second claim fails with `AlreadyClaimed`. While any guard is alive
    /// the manager cannot be borrowed mutably, so the region cannot be reclassified under the
    /// allocator.
    pub fn claim_alloc_region(&self, index: usize) -> RegionResult<AllocRegion<'_>> {
        let region = self.table.at(index)?;
        Self::check_allocatable(region)?;
        if !region.try_claim() {
            return Err(RegionError::AlreadyClaimed(index));
        }
        Ok(AllocRegion { region })
    }

    /// Commit regions until `new_length` regions are committed. Committing the current length
    /// is a no-op; a smaller length is an error (use [`HeapRegionManager::shrink_by`]).
    pub fn commit_up_to(&mut self, new_length: usize) -> RegionResult<()> {
        let length = self.length();
        if new_length < length {
            return Err(RegionError::InvalidExpansion {
                requested: new_length,
                length,
                max_length: self.max_length(),
            });
        }
        if new_length == length {
            return Ok(());
        }
        self.expand_by(new_length - length).map(|_| ())
    }

    /// Commit `num_regions` more regions. Returns the index of the first newly committed region.
    pub fn expand_by(&mut self, num_regions: usize) -> RegionResult<usize> {
        let length = self.length();
        let target = length.saturating_add(num_regions);
        if num_regions == 0 || target > self.max_length() {
            return Err(RegionError::InvalidExpansion {
                requested: target,
                length,
                max_length: self.max_length(),
            });
        }

        // Re-commit slots left behind by an earlier shrink first.
        let recommit_end = target.min(self.table.length());
        for index in length..recommit_end {
            self.table.at_mut(index)?.set_committed(true);
        }
        if target > self.table.length() {
            self.table.commit_up_to(target)?;
        }
        self.committed_length = target;
        info!(
            "Heap expanded by {} regions to {} ({})",
            num_regions,
            target,
            conversions::bytes_to_formatted_string(self.capacity())
        );
        Ok(length)
    }

    /// Uncommit up to `num_regions` trailing free regions. Stops at the first trailing region that
    /// is not free. The slots stay in the table. Returns the number of regions uncommitted.
    pub fn shrink_by(&mut self, num_regions: usize) -> usize {
        let mut removed = 0;
        while removed < num_regions && self.committed_length > 0 {
            let index = self.committed_length - 1;
            let region = match self.table.at_mut(index) {
                Ok(region) => region,
                Err(_) => break,
            };
            if !region.is_free() {
                break;
            }
            region.set_committed(false);
            self.committed_length -= 1;
            removed += 1;
        }
        if removed > 0 {
            info!(
                "Heap shrunk by {} regions to {} ({})",
                removed,
                self.committed_length,
                conversions::bytes_to_formatted_string(self.capacity())
            );
        }
        removed
    }

    /// The first index of `num_regions` contiguous committed free regions.
    pub fn find_contiguous_free(&self, num_regions: usize) -> Option<usize> {
        if num_regions == 0 {
            return None;
        }
        let mut run_start = 0;
        let mut run_length = 0;
        for region in self.heap_region_iter() {
            if region.is_free() {
                if run_length == 0 {
                    run_start = region.index();
                }
                run_length += 1;
                if run_length == num_regions {
                    return Some(run_start);
                }
            } else {
                run_length = 0;
            }
        }
        None
    }

    /// The number of free regions at the end of the committed prefix. A humongous span that
    /// does not fit can reuse these if the heap is expanded behind them.
    pub fn trailing_free_regions(&self) -> usize {
        self.table
            .iter()
            .take(self.committed_length)
            .rev()
            .take_while(|r| r.is_free())
            .count()
    }

    /// Allocate a humongous object of `bytes` bytes in a run of contiguous free regions.
    /// Returns the index of the StartsHumongous region. Every region of the span but the last
    /// is filled up to its end; the last region's `top` is the end of the object.
    pub fn allocate_humongous(&mut self, bytes: usize) -> RegionResult<usize> {
        let log_grain = self.table.log_grain_bytes();
        if bytes == 0 {
            return Err(RegionError::ZeroSizedHumongous);
        }
        let num_regions = conversions::bytes_to_regions_up(bytes, log_grain);
        let start = self
            .find_contiguous_free(num_regions)
            .ok_or(RegionError::OutOfRegions {
                requested: bytes,
                regions: num_regions,
            })?;

        self.reclassify(start, RegionType::STARTS_HUMONGOUS)?;
        for index in start + 1..start + num_regions {
            self.reclassify(index, RegionType::CONTINUES_HUMONGOUS)?;
        }

        let last = start + num_regions - 1;
        let tail_bytes = bytes - conversions::regions_to_bytes(num_regions - 1, log_grain);
        for index in start..=last {
            let region = self.table.at_mut(index)?;
            let top = if index == last {
                region.bottom() + tail_bytes
            } else {
                region.end()
            };
            region.set_top(top);
        }
        debug!(
            "Humongous object of {} bytes allocated in regions [{}, {}]",
            bytes, start, last
        );
        Ok(start)
    }

    /// Free the humongous span that starts at `start`, tail first. Returns the number of regions freed.
    pub fn free_humongous(&mut self, start: usize) -> RegionResult<usize> {
        let region = self.table.at(start)?;
        if !region.is_starts_humongous() {
            return Err(RegionError::InconsistentClassification {
                index: start,
                from: region.kind(),
                to: RegionType::FREE,
            });
        }
        let mut end = start + 1;
        while self.has_humongous_continuation(end - 1) {
            end += 1;
        }
        for index in (start..end).rev() {
            self.reclassify(index, RegionType::FREE)?;
        }
        debug!("Humongous span [{}, {}) freed", start, end);
        Ok(end - start)
    }

    /// Check the structural invariants: region bounds, committed prefix, well-formed types,
    /// humongous continuity, and that the sets agree exactly with the region types.
    pub fn verify(&self) -> RegionResult<()> {
        let grain_bytes = self.grain_bytes();
        let mut expected = [0usize; 3];

        for region in self.table.iter() {
            let index = region.index();
            let fail = |what: &str| {
                Err(RegionError::VerificationFailed(format!(
                    "region {} ({}): {}",
                    index,
                    region.kind(),
                    what
                )))
            };
            if !(region.bottom() <= region.top() && region.top() <= region.end()) {
                return fail("top outside [bottom, end]");
            }
            if region.end() - region.bottom() != grain_bytes {
                return fail("size differs from the grain size");
            }
            if region.is_committed() != (index < self.committed_length) {
                return fail("committed regions are not a prefix of the table");
            }
            if !region.is_committed() && !region.is_free() {
                return fail("uncommitted region is not free");
            }
            if !region.kind().is_well_formed() {
                return fail("pinned or archive flag on a young or free region");
            }
            if region.is_continues_humongous() {
                let start = region.humongous_start_region();
                let prev = index.checked_sub(1).and_then(|p| self.table.at(p).ok());
                if start.is_none() || !prev.is_some_and(|p| p.is_humongous() && p.humongous_start_region() == start) {
                    return fail("ContinuesHumongous region is not part of a span");
                }
            }
            let member_of: Vec<bool> = RegionSetKind::iter()
                .map(|kind| self.set(kind).contains(index))
                .collect();
            if member_of.iter().filter(|m| **m).count() > 1 {
                return fail("member of more than one region set");
            }
            let wanted = RegionSetKind::for_type(region.kind());
            for (slot, kind) in RegionSetKind::iter().enumerate() {
                if member_of[slot] != (wanted == Some(kind)) {
                    return fail(&format!("membership of the {} set disagrees with the type", kind));
                }
                if wanted == Some(kind) {
                    expected[slot] += 1;
                }
            }
        }

        for (slot, set) in RegionSetKind::iter().map(|kind| self.set(kind)).enumerate() {
            if set.len() != expected[slot] {
                return Err(RegionError::VerificationFailed(format!(
                    "{} set has {} members, expected {}: [{}]",
                    set.kind(),
                    set.len(),
                    expected[slot],
                    set.iter().join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Iterator over the committed regions of a [`HeapRegionManager`], in index order.
pub struct HeapRegionIterator<'a> {
    inner: std::slice::Iter<'a, HeapRegion>,
}

impl<'a> Iterator for HeapRegionIterator<'a> {
    type Item = &'a HeapRegion;

    fn next(&mut self) -> Option<&'a HeapRegion> {
        self.inner.by_ref().find(|r| r.is_committed())
    }
}

/// A region handed to exactly one allocating owner. See [`HeapRegionManager::claim_alloc_region`].
#[derive(Debug)]
pub struct AllocRegion<'a> {
    region: &'a HeapRegion,
}

impl<'a> AllocRegion<'a> {
    pub fn region(&self) -> &'a HeapRegion {
        self.region
    }

    pub fn index(&self) -> usize {
        self.region.index()
    }

    /// Bump-allocate in the claimed region without taking any lock.
    pub fn allocate(&self, bytes: usize) -> RegionResult<Address> {
        self.region.bump(bytes)
    }
}

impl Drop for AllocRegion<'_> {
    fn drop(&mut self) {
        self.region.release_claim();
    }
}

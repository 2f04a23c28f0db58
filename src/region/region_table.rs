use super::HeapRegion;
use crate::error::{RegionError, RegionResult};
use crate::util::conversions;
use crate::util::Address;

/// A dense, address-indexed table of regions covering the reserved heap.
///
/// Slots are appended at the tail by [`HeapRegionTable::commit_up_to`] and never reordered or
/// removed, so a region index and its address range stay fixed for the lifetime of the heap.
/// Both lookups are O(1): by index directly, by address with a subtract and a shift.
#[derive(Debug)]
pub struct HeapRegionTable {
    regions: Vec<HeapRegion>,
    heap_base: Address,
    log_grain_bytes: usize,
    max_length: usize,
}

impl HeapRegionTable {
    /// Create an empty table for `max_length` regions of `grain_bytes` starting at `heap_base`.
    pub fn new(heap_base: Address, grain_bytes: usize, max_length: usize) -> RegionResult<Self> {
        if !grain_bytes.is_power_of_two() {
            return Err(RegionError::InvalidConfiguration(format!(
                "grain size {} is not a power of two",
                grain_bytes
            )));
        }
        if !heap_base.is_aligned_to(grain_bytes) {
            return Err(RegionError::InvalidConfiguration(format!(
                "heap base {} is not aligned to the grain size {}",
                heap_base, grain_bytes
            )));
        }
        if max_length
            .checked_mul(grain_bytes)
            .and_then(|bytes| heap_base.checked_add(bytes))
            .is_none()
        {
            return Err(RegionError::InvalidConfiguration(format!(
                "{} regions of {} bytes at {} overflow the address space",
                max_length, grain_bytes, heap_base
            )));
        }
        Ok(HeapRegionTable {
            regions: Vec::new(),
            heap_base,
            log_grain_bytes: conversions::log2_of_power_of_two(grain_bytes),
            max_length,
        })
    }

    pub fn length(&self) -> usize {
        self.regions.len()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn grain_bytes(&self) -> usize {
        1 << self.log_grain_bytes
    }

    pub fn log_grain_bytes(&self) -> usize {
        self.log_grain_bytes
    }

    pub fn heap_base(&self) -> Address {
        self.heap_base
    }

    /// End of the last slot in the table.
    pub fn heap_end(&self) -> Address {
        self.heap_base + conversions::regions_to_bytes(self.length(), self.log_grain_bytes)
    }

    /// End of the reservation.
    pub fn reserved_end(&self) -> Address {
        self.heap_base + conversions::regions_to_bytes(self.max_length, self.log_grain_bytes)
    }

    pub fn at(&self, index: usize) -> RegionResult<&HeapRegion> {
        let length = self.length();
        self.regions
            .get(index)
            .ok_or(RegionError::IndexOutOfRange { index, length })
    }

    pub fn at_mut(&mut self, index: usize) -> RegionResult<&mut HeapRegion> {
        let length = self.length();
        self.regions
            .get_mut(index)
            .ok_or(RegionError::IndexOutOfRange { index, length })
    }

    /// The index of the slot covering `addr`.
    pub fn index_for_address(&self, addr: Address) -> RegionResult<usize> {
        if addr < self.heap_base || addr >= self.heap_end() {
            return Err(RegionError::AddressNotInHeap(addr));
        }
        Ok((addr - self.heap_base) >> self.log_grain_bytes)
    }

    pub fn region_for_address(&self, addr: Address) -> RegionResult<&HeapRegion> {
        let index = self.index_for_address(addr)?;
        Ok(&self.regions[index])
    }

    pub fn region_for_address_mut(&mut self, addr: Address) -> RegionResult<&mut HeapRegion> {
        let index = self.index_for_address(addr)?;
        Ok(&mut self.regions[index])
    }

    /// Append `Free` regions until the table holds `new_length` slots. The table never shrinks;
    /// asking for the current length is a no-op.
    pub fn commit_up_to(&mut self, new_length: usize) -> RegionResult<()> {
        let length = self.length();
        if new_length < length || new_length > self.max_length {
            return Err(RegionError::InvalidExpansion {
                requested: new_length,
                length,
                max_length: self.max_length,
            });
        }
        if new_length == length {
            return Ok(());
        }
        let grain_bytes = self.grain_bytes();
        for index in length..new_length {
            let bottom = self.heap_base + conversions::regions_to_bytes(index, self.log_grain_bytes);
            self.regions.push(HeapRegion::new(index, bottom, grain_bytes));
        }
        debug!(
            "Region table committed {} -> {} regions ({} - {})",
            length,
            new_length,
            self.heap_base,
            self.heap_end()
        );
        Ok(())
    }

    /// Every slot, committed or not, in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, HeapRegion> {
        self.regions.iter()
    }
}

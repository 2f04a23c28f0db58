use crate::error::{RegionError, RegionResult};
use crate::monitoring::G1MonitoringSupport;
use crate::region::{HeapRegion, HeapRegionIterator, HeapRegionManager, RegionType};
use crate::util::conversions;
use crate::util::options::Options;
use crate::util::Address;
use delegate::delegate;
use std::io;
use std::sync::Arc;

/// A heap shared between the collector and inspection clients. The collector takes the write
/// lock for the duration of a pause; inspection clients and allocating threads take read locks.
pub type SharedHeap = spin::RwLock<G1CollectedHeap>;

/// The garbage-first heap: the region manager, its region sets and the monitoring snapshot,
/// built from [`Options`].
///
/// The collector mutates the heap through `&mut self` (`reclassify`, `allocate_humongous`,
/// `expand_by`, `refresh_monitoring`, ...). Everything reachable through `&self` is read-only,
/// apart from bump allocation in a region claimed with
/// [`HeapRegionManager::claim_alloc_region`].
#[derive(Debug)]
pub struct G1CollectedHeap {
    manager: HeapRegionManager,
    monitoring: G1MonitoringSupport,
    options: Options,
}

impl G1CollectedHeap {
    pub fn new(options: &Options) -> RegionResult<Self> {
        if !options.is_valid() {
            return Err(RegionError::InvalidConfiguration(format!(
                "options failed validation: {:?}",
                options
            )));
        }
        if options.initial_regions > options.max_regions {
            return Err(RegionError::InvalidConfiguration(format!(
                "initial regions {} exceed max regions {}",
                options.initial_regions, options.max_regions
            )));
        }
        let manager = HeapRegionManager::with_committed(
            options.heap_base,
            options.grain_bytes,
            options.initial_regions,
            options.max_regions,
        )?;
        info!(
            "Created G1 heap at {}: {} regions of {} committed, {} reserved",
            options.heap_base,
            options.initial_regions,
            conversions::bytes_to_formatted_string(options.grain_bytes),
            options.max_regions
        );
        let mut heap = G1CollectedHeap {
            manager,
            monitoring: G1MonitoringSupport::new(),
            options: options.clone(),
        };
        heap.monitoring.refresh(&heap.manager);
        Ok(heap)
    }

    pub fn into_shared(self) -> Arc<SharedHeap> {
        Arc::new(spin::RwLock::new(self))
    }

    delegate! {
        to self.manager {
            /// Committed heap size in bytes.
            pub fn capacity(&self) -> usize;
            /// The number of committed regions.
            #[call(length)]
            pub fn n_regions(&self) -> usize;
            #[call(max_length)]
            pub fn max_regions(&self) -> usize;
            pub fn grain_bytes(&self) -> usize;
            pub fn heap_base(&self) -> Address;
            pub fn heap_region_iter(&self) -> HeapRegionIterator<'_>;
            /// The committed region covering `addr`.
            #[call(get_by_address)]
            pub fn region_for_address(&self, addr: Address) -> RegionResult<&HeapRegion>;
            #[call(at)]
            pub fn region_at(&self, index: usize) -> RegionResult<&HeapRegion>;
        }
        to self.manager {
            pub fn reclassify(&mut self, index: usize, kind: RegionType) -> RegionResult<()>;
            pub fn free_region(&mut self, index: usize) -> RegionResult<()>;
            pub fn free_humongous(&mut self, start: usize) -> RegionResult<usize>;
            pub fn expand_by(&mut self, num_regions: usize) -> RegionResult<usize>;
            pub fn shrink_by(&mut self, num_regions: usize) -> usize;
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn manager(&self) -> &HeapRegionManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut HeapRegionManager {
        &mut self.manager
    }

    pub fn monitoring(&self) -> &G1MonitoringSupport {
        &self.monitoring
    }

    /// Bytes used in all committed regions, computed now rather than taken from the snapshot.
    pub fn used(&self) -> usize {
        self.manager.heap_region_iter().map(|r| r.used()).sum()
    }

    pub fn old_regions_count(&self) -> usize {
        self.manager.old_set().len()
    }

    pub fn archive_regions_count(&self) -> usize {
        self.manager.archive_set().len()
    }

    pub fn humongous_regions_count(&self) -> usize {
        self.manager.humongous_set().len()
    }

    /// Apply `closure` to every committed region; the closure returns `true` to stop.
    pub fn heap_region_iterate<F>(&self, closure: F) -> bool
    where
        F: FnMut(&HeapRegion) -> bool,
    {
        self.manager.heap_region_iterate(closure)
    }

    pub fn live_regions_iterate<F>(&self, visitor: F)
    where
        F: FnMut(&HeapRegion),
    {
        self.manager.live_regions_iterate(visitor)
    }

    /// Allocate a humongous object. If no run of free regions is long enough and the options
    /// allow it, commit just enough regions behind the trailing free regions to complete a run
    /// and retry once.
    pub fn allocate_humongous(&mut self, bytes: usize) -> RegionResult<usize> {
        match self.manager.allocate_humongous(bytes) {
            Err(RegionError::OutOfRegions { requested, regions })
                if self.options.expand_on_humongous =>
            {
                let shortfall = regions.saturating_sub(self.manager.trailing_free_regions());
                debug!(
                    "No {} contiguous free regions for {} bytes. Trying to expand the heap by {}.",
                    regions, requested, shortfall
                );
                if self.manager.expand_by(shortfall).is_err() {
                    warn!(
                        "Failed to expand the heap for a humongous allocation of {} bytes",
                        requested
                    );
                    return Err(RegionError::OutOfRegions { requested, regions });
                }
                self.manager.allocate_humongous(bytes)
            }
            result => result,
        }
    }

    /// Recompute the monitoring snapshot. With `verify_monitoring` set, the snapshot and the
    /// region structure are cross-checked afterwards.
    pub fn refresh_monitoring(&mut self) -> RegionResult<()> {
        self.monitoring.refresh(&self.manager);
        if self.options.verify_monitoring {
            self.manager.verify()?;
            self.monitoring.verify(&self.manager)?;
        }
        Ok(())
    }

    /// A short summary of the heap.
    pub fn print_on<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        let kb = |bytes: usize| bytes / 1024;
        let (mut eden, mut survivors) = (0, 0);
        for region in self.manager.heap_region_iter() {
            if region.is_eden() {
                eden += 1;
            } else if region.is_survivor() {
                survivors += 1;
            }
        }
        writeln!(
            out,
            " garbage-first heap   total {}K, used {}K [{}, {})",
            kb(self.capacity()),
            kb(self.used()),
            self.manager.heap_base(),
            self.manager.table().reserved_end()
        )?;
        writeln!(
            out,
            "  region size {}K, {} young ({}K), {} survivors ({}K)",
            kb(self.grain_bytes()),
            eden + survivors,
            kb((eden + survivors) * self.grain_bytes()),
            survivors,
            kb(survivors * self.grain_bytes())
        )
    }

    /// One line per committed region.
    pub fn print_region_details<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "Heap Regions: E=young(eden), S=young(survivor), O=old, HS=humongous(starts), HC=humongous(continues), F=free, A=archive, P=pinned"
        )?;
        writeln!(
            out,
            "|{:>5}|{:^46}|{:>4}|{:>3}|",
            "index", "bottom, top, end", "used", "typ"
        )?;
        for region in self.manager.heap_region_iter() {
            writeln!(out, "{}", region)?;
        }
        Ok(())
    }
}

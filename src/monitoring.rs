//! Occupancy counters for monitoring tools.
//!
//! The counters are a snapshot. They are recomputed from the regions on an explicit
//! [`G1MonitoringSupport::refresh`], typically at the end of every pause that changed region
//! classifications, and never updated incrementally, so a missed transition cannot make them
//! drift. Reads never recompute.

use crate::error::{RegionError, RegionResult};
use crate::region::{HeapRegionManager, RegionType};
use enum_map::{Enum, EnumMap};
use strum_macros::Display;

/// The generations monitoring reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Display)]
pub enum Generation {
    Eden,
    Survivor,
    /// Old, archive and humongous regions.
    Old,
}

impl Generation {
    /// The generation a region of the given type is counted in. Free regions are in none.
    pub const fn of(kind: RegionType) -> Option<Generation> {
        if kind.is_eden() {
            Some(Generation::Eden)
        } else if kind.is_survivor() {
            Some(Generation::Survivor)
        } else if kind.is_old_or_humongous() {
            Some(Generation::Old)
        } else {
            None
        }
    }
}

/// Committed and used bytes of one generation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpaceUsage {
    pub committed: usize,
    pub used: usize,
    pub regions: usize,
}

#[derive(Debug, Default)]
pub struct G1MonitoringSupport {
    grain_bytes: usize,
    usage: EnumMap<Generation, SpaceUsage>,
    overall_committed: usize,
    overall_used: usize,
    refreshes: usize,
}

impl G1MonitoringSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every counter with one pass over the committed regions.
    pub fn refresh(&mut self, manager: &HeapRegionManager) {
        let grain_bytes = manager.grain_bytes();
        let mut usage: EnumMap<Generation, SpaceUsage> = EnumMap::default();
        let mut overall_used = 0;

        for region in manager.heap_region_iter() {
            let used = region.used();
            overall_used += used;
            if let Some(generation) = Generation::of(region.kind()) {
                let bucket = &mut usage[generation];
                bucket.committed += grain_bytes;
                bucket.used += used;
                bucket.regions += 1;
            }
        }

        self.grain_bytes = grain_bytes;
        self.usage = usage;
        self.overall_committed = manager.capacity();
        self.overall_used = overall_used;
        self.refreshes += 1;
        trace!(
            "Monitoring refreshed: eden {}/{} survivor {}/{} old {}/{} overall {}/{}",
            self.eden_space_used(),
            self.eden_space_committed(),
            self.survivor_space_used(),
            self.survivor_space_committed(),
            self.old_gen_used(),
            self.old_gen_committed(),
            self.overall_used,
            self.overall_committed
        );
    }

    /// How many times the snapshot has been refreshed.
    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    pub fn usage(&self, generation: Generation) -> SpaceUsage {
        self.usage[generation]
    }

    pub fn eden_space_committed(&self) -> usize {
        self.usage[Generation::Eden].committed
    }

    pub fn eden_space_used(&self) -> usize {
        self.usage[Generation::Eden].used
    }

    pub fn survivor_space_committed(&self) -> usize {
        self.usage[Generation::Survivor].committed
    }

    pub fn survivor_space_used(&self) -> usize {
        self.usage[Generation::Survivor].used
    }

    pub fn old_gen_committed(&self) -> usize {
        self.usage[Generation::Old].committed
    }

    pub fn old_gen_used(&self) -> usize {
        self.usage[Generation::Old].used
    }

    pub fn overall_committed(&self) -> usize {
        self.overall_committed
    }

    pub fn overall_used(&self) -> usize {
        self.overall_used
    }

    /// Eden used bytes expressed in whole regions. Eden occupancy that is not a whole number of
    /// regions (a partially filled allocation region) is reported as an inconsistency rather
    /// than rounded.
    pub fn eden_space_region_num(&self) -> RegionResult<usize> {
        let used = self.eden_space_used();
        if used == 0 {
            return Ok(0);
        }
        if used % self.grain_bytes != 0 {
            return Err(RegionError::InconsistentMonitoring(format!(
                "eden used {} bytes is not a whole number of {}-byte regions",
                used, self.grain_bytes
            )));
        }
        Ok(used / self.grain_bytes)
    }

    /// The number of eden regions at the last refresh.
    pub fn eden_region_count(&self) -> usize {
        self.usage[Generation::Eden].regions
    }

    pub fn survivor_space_region_num(&self) -> usize {
        self.usage[Generation::Survivor].regions
    }

    pub fn old_gen_region_num(&self) -> usize {
        self.usage[Generation::Old].regions
    }

    /// Check the snapshot against the current region state: for every generation
    /// `used <= committed` and `committed == regions * grain_bytes`, with the region count and
    /// used bytes matching a fresh count.
    pub fn verify(&self, manager: &HeapRegionManager) -> RegionResult<()> {
        let grain_bytes = manager.grain_bytes();
        let mut fresh: EnumMap<Generation, SpaceUsage> = EnumMap::default();
        for region in manager.heap_region_iter() {
            if let Some(generation) = Generation::of(region.kind()) {
                fresh[generation].regions += 1;
                fresh[generation].used += region.used();
            }
        }

        for (generation, snapshot) in self.usage.iter() {
            if snapshot.used > snapshot.committed {
                return Err(RegionError::InconsistentMonitoring(format!(
                    "{} used {} exceeds committed {}",
                    generation, snapshot.used, snapshot.committed
                )));
            }
            if snapshot.committed != snapshot.regions * grain_bytes {
                return Err(RegionError::InconsistentMonitoring(format!(
                    "{} committed {} is not {} regions of {} bytes",
                    generation, snapshot.committed, snapshot.regions, grain_bytes
                )));
            }
            let expected = fresh[generation];
            if snapshot.regions != expected.regions || snapshot.used != expected.used {
                return Err(RegionError::InconsistentMonitoring(format!(
                    "{} snapshot has {} regions / {} bytes used, heap has {} / {}",
                    generation, snapshot.regions, snapshot.used, expected.regions, expected.used
                )));
            }
        }
        if self.overall_used > self.overall_committed {
            return Err(RegionError::InconsistentMonitoring(format!(
                "overall used {} exceeds committed {}",
                self.overall_used, self.overall_committed
            )));
        }
        Ok(())
    }
}

//! The region model: regions, their classification, the region table, the region manager and
//! the named region sets.

mod heap_region;
mod region_manager;
mod region_set;
mod region_table;
mod region_type;

pub use self::heap_region::HeapRegion;
pub use self::region_manager::{AllocRegion, HeapRegionIterator, HeapRegionManager};
pub use self::region_set::{HeapRegionSet, RegionSetKind};
pub use self::region_table::HeapRegionTable;
pub use self::region_type::{RegionState, RegionType};

//! Region bookkeeping for a regionalized garbage-first heap.
//!
//! The heap is divided into equally sized, power-of-two aligned regions. This crate keeps track
//! of every region's classification (free, eden, survivor, humongous, old, with pinned and
//! archive flags), maintains the named region sets (old, archive, humongous), answers
//! address-to-region queries in constant time, and computes occupancy counters for monitoring.
//!
//! The entry point is [`G1CollectedHeap`], built from [`util::options::Options`]:
//!
//! ```ignore
//! let options = g1_regions::util::options::Options::default();
//! let mut heap = g1_regions::G1CollectedHeap::new(&options)?;
//! heap.reclassify(0, g1_regions::region::RegionType::EDEN)?;
//! heap.refresh_monitoring()?;
//! ```
//!
//! Evacuation, marking, remembered sets and collection policy are not part of this crate. A
//! collector drives the region model through [`G1CollectedHeap`] and
//! [`region::HeapRegionManager`]; an inspection client reads it through [`inspection`].

#[macro_use]
extern crate log;

pub mod error;
mod g1_heap;
pub mod inspection;
pub mod monitoring;
pub mod region;
pub mod util;

pub use crate::error::{RegionError, RegionResult};
pub use crate::g1_heap::{G1CollectedHeap, SharedHeap};
pub use crate::monitoring::{G1MonitoringSupport, Generation};

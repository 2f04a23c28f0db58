//! Errors reported by the region bookkeeping core.
//!
//! Every failure is local and recoverable by the caller: a collector that sees
//! [`RegionError::OutOfRegion`] should start a collection or expand the heap, and an
//! inspection client that sees [`RegionError::AddressNotInHeap`] should treat the
//! address as foreign. Nothing in this crate aborts the process on caller input.

use crate::region::{RegionSetKind, RegionType};
use crate::util::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    /// A region index at or beyond the table length.
    #[error("region index {index} out of range (length {length})")]
    IndexOutOfRange { index: usize, length: usize },

    /// An address outside the committed part of the reserved heap.
    #[error("address {0} is not in the heap")]
    AddressNotInHeap(Address),

    /// A humongous allocation request of zero bytes.
    #[error("humongous allocation of zero bytes")]
    ZeroSizedHumongous,

    /// A bump allocation that does not fit before the region end.
    #[error("region {index} cannot allocate {requested} bytes ({free} bytes free)")]
    OutOfRegion {
        index: usize,
        requested: usize,
        free: usize,
    },

    /// No run of contiguous free regions large enough for a humongous object.
    #[error("no {regions} contiguous free regions for a humongous object of {requested} bytes")]
    OutOfRegions { requested: usize, regions: usize },

    /// A region whose classification does not accept bump allocation.
    #[error("region {index} of type {kind} does not accept allocation")]
    NotAllocatable { index: usize, kind: RegionType },

    /// A commit request that would not grow the table, or would grow it past the reservation.
    #[error("cannot commit up to {requested} regions (committed {length}, reserved {max_length})")]
    InvalidExpansion {
        requested: usize,
        length: usize,
        max_length: usize,
    },

    /// A region added to a set it already belongs to.
    #[error("region {index} is already a member of the {set} set")]
    AlreadyMember { set: RegionSetKind, index: usize },

    /// A region removed from a set it does not belong to.
    #[error("region {index} is not a member of the {set} set")]
    NotMember { set: RegionSetKind, index: usize },

    /// A classification change that is not a legal transition.
    #[error("region {index} cannot be reclassified from {from} to {to}")]
    InconsistentClassification {
        index: usize,
        from: RegionType,
        to: RegionType,
    },

    /// A region already assigned to another allocating owner.
    #[error("region {0} is already claimed by another allocator")]
    AlreadyClaimed(usize),

    /// Monitoring counters that disagree with the region state.
    #[error("inconsistent monitoring data: {0}")]
    InconsistentMonitoring(String),

    /// A region table, region set or region whose state breaks a structural invariant.
    #[error("heap verification failed: {0}")]
    VerificationFailed(String),

    /// Options that cannot describe a heap.
    #[error("invalid heap configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for region bookkeeping operations.
pub type RegionResult<T> = Result<T, RegionError>;

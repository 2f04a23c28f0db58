mod common;

use common::*;
use g1_regions::monitoring::G1MonitoringSupport;
use g1_regions::region::{HeapRegionManager, RegionSetKind, RegionType};
use g1_regions::util::Address;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strum::IntoEnumIterator;

const CANDIDATES: [RegionType; 9] = [
    RegionType::FREE,
    RegionType::EDEN,
    RegionType::SURVIVOR,
    RegionType::OLD,
    RegionType::ARCHIVE,
    RegionType::OLD.with_pinned(),
    RegionType::STARTS_HUMONGOUS,
    RegionType::CONTINUES_HUMONGOUS,
    RegionType::STARTS_HUMONGOUS.with_pinned(),
];

fn check_coverage(m: &HeapRegionManager) {
    let mut expected_bottom = m.heap_base();
    for region in m.heap_region_iter() {
        assert_eq!(region.bottom(), expected_bottom);
        assert_eq!(region.end() - region.bottom(), m.grain_bytes());
        assert!(region.bottom() <= region.top() && region.top() <= region.end());
        expected_bottom = region.end();
    }
    assert_eq!(expected_bottom - m.heap_base(), m.capacity());
}

fn check_exclusivity(m: &HeapRegionManager) {
    for region in m.heap_region_iter() {
        let memberships = RegionSetKind::iter()
            .filter(|kind| m.set(*kind).contains(region.index()))
            .count();
        assert!(memberships <= 1, "region {} is in {} sets", region.index(), memberships);
        if region.is_free() || region.is_young() {
            assert_eq!(memberships, 0);
        }
    }
}

fn check_monitoring(m: &HeapRegionManager) {
    let mut monitoring = G1MonitoringSupport::new();
    monitoring.refresh(m);
    assert!(monitoring.eden_space_used() <= monitoring.eden_space_committed());
    assert!(monitoring.survivor_space_used() <= monitoring.survivor_space_committed());
    assert!(monitoring.old_gen_used() <= monitoring.old_gen_committed());
    assert!(monitoring.overall_used() <= monitoring.overall_committed());
    assert_eq!(
        monitoring.eden_space_committed(),
        monitoring.eden_region_count() * m.grain_bytes()
    );
    monitoring.verify(m).unwrap();
}

#[test]
fn random_reclassification_preserves_invariants() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x61);
    let mut m = manager(16);
    let mut accepted = 0;

    for _ in 0..2000 {
        let index = rng.random_range(0..m.length());
        let kind = CANDIDATES[rng.random_range(0..CANDIDATES.len())];
        let before = m.at(index).unwrap().kind();
        match m.reclassify(index, kind) {
            Ok(()) => {
                accepted += 1;
                assert_eq!(m.at(index).unwrap().kind(), kind);
                if m.at(index).unwrap().kind().is_young() {
                    let _ = m.allocate(index, rng.random_range(1..MB / 4));
                }
            }
            // A refused transition leaves everything unchanged.
            Err(_) => assert_eq!(m.at(index).unwrap().kind(), before),
        }
        m.verify().unwrap();
    }

    assert!(accepted > 0);
    check_coverage(&m);
    check_exclusivity(&m);
    check_monitoring(&m);
}

#[test]
fn random_humongous_allocation_and_free() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut m = manager(32);
    let mut spans = vec![];

    for _ in 0..500 {
        if spans.is_empty() || rng.random_bool(0.6) {
            let bytes = rng.random_range(1..6 * MB);
            if let Ok(start) = m.allocate_humongous(bytes) {
                spans.push(start);
            }
        } else {
            let start = spans.swap_remove(rng.random_range(0..spans.len()));
            m.free_humongous(start).unwrap();
        }
        m.verify().unwrap();
        check_exclusivity(&m);
    }
    check_monitoring(&m);
}

#[test]
fn iteration_is_idempotent() {
    let mut m = manager(8);
    m.reclassify(3, RegionType::OLD).unwrap();
    m.allocate(3, 100).unwrap();
    let first: Vec<_> = m.heap_region_iter().map(|r| (r.index(), r.used())).collect();
    let second: Vec<_> = m.heap_region_iter().map(|r| (r.index(), r.used())).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 8);
}

#[test]
fn address_round_trip() {
    let m = manager(8);
    for region in m.heap_region_iter() {
        for offset in [0, 1, MB / 2, MB - 1] {
            let addr = region.bottom() + offset;
            assert_eq!(m.get_by_address(addr).unwrap().index(), region.index());
        }
    }
    let beyond: Address = m.heap_base() + 8 * MB;
    assert!(m.get_by_address(beyond).is_err());
    let below: Address = m.heap_base() - 1usize;
    assert!(m.get_by_address(below).is_err());
}

#[test]
fn shrink_and_expand_keep_the_prefix_committed() {
    let mut m = manager(8);
    m.reclassify(5, RegionType::OLD).unwrap();
    // Stops at the first trailing region that is not free.
    assert_eq!(m.shrink_by(4), 2);
    assert_eq!(m.length(), 6);
    assert!(m.get_by_address(m.heap_base() + 7 * MB).is_err());
    check_coverage(&m);

    assert_eq!(m.expand_by(3).unwrap(), 6);
    assert_eq!(m.length(), 9);
    assert!(m.at(7).unwrap().is_committed());
    assert!(m.at(8).unwrap().is_free());
    check_coverage(&m);
    m.verify().unwrap();
}

use super::RegionType;
use crate::error::{RegionError, RegionResult};
use crate::util::constants::{BITS_IN_WORD, LOG_BITS_IN_WORD};
use strum_macros::{Display, EnumIter};

/// The named region sets maintained alongside the region table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum RegionSetKind {
    Old,
    Archive,
    Humongous,
}

impl RegionSetKind {
    /// The set a region of the given type belongs to, if any. Archive takes precedence over
    /// humongous, and humongous over old, so the sets are mutually exclusive by construction.
    pub const fn for_type(kind: RegionType) -> Option<RegionSetKind> {
        if kind.is_archive() {
            Some(RegionSetKind::Archive)
        } else if kind.is_humongous() {
            Some(RegionSetKind::Humongous)
        } else if kind.is_old() {
            Some(RegionSetKind::Old)
        } else {
            None
        }
    }
}

/// Membership bookkeeping for one named set of regions, keyed by region index.
///
/// Backed by a bitmap with one bit per region plus a population count, so `add`, `remove`,
/// `contains` and `len` are all O(1). The bitmap grows with the region table.
#[derive(Debug)]
pub struct HeapRegionSet {
    kind: RegionSetKind,
    bits: Vec<usize>,
    length: usize,
}

impl HeapRegionSet {
    pub fn new(kind: RegionSetKind, max_regions: usize) -> Self {
        HeapRegionSet {
            kind,
            bits: vec![0; Self::words_for(max_regions)],
            length: 0,
        }
    }

    fn words_for(regions: usize) -> usize {
        (regions + BITS_IN_WORD - 1) >> LOG_BITS_IN_WORD
    }

    fn word_and_mask(index: usize) -> (usize, usize) {
        (index >> LOG_BITS_IN_WORD, 1 << (index & (BITS_IN_WORD - 1)))
    }

    pub fn kind(&self) -> RegionSetKind {
        self.kind
    }

    pub fn name(&self) -> String {
        self.kind.to_string()
    }

    /// Make sure the bitmap can hold `regions` indices.
    pub(crate) fn ensure_capacity(&mut self, regions: usize) {
        let words = Self::words_for(regions);
        if words > self.bits.len() {
            self.bits.resize(words, 0);
        }
    }

    pub(crate) fn add(&mut self, index: usize) -> RegionResult<()> {
        if self.contains(index) {
            return Err(RegionError::AlreadyMember {
                set: self.kind,
                index,
            });
        }
        self.ensure_capacity(index + 1);
        let (word, mask) = Self::word_and_mask(index);
        self.bits[word] |= mask;
        self.length += 1;
        Ok(())
    }

    pub(crate) fn remove(&mut self, index: usize) -> RegionResult<()> {
        if !self.contains(index) {
            return Err(RegionError::NotMember {
                set: self.kind,
                index,
            });
        }
        let (word, mask) = Self::word_and_mask(index);
        self.bits[word] &= !mask;
        self.length -= 1;
        Ok(())
    }

    pub fn contains(&self, index: usize) -> bool {
        let (word, mask) = Self::word_and_mask(index);
        self.bits.get(word).is_some_and(|w| w & mask != 0)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Members in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != 0)
            .flat_map(|(i, w)| {
                let w = *w;
                (0..BITS_IN_WORD)
                    .filter(move |bit| w & (1 << bit) != 0)
                    .map(move |bit| (i << LOG_BITS_IN_WORD) + bit)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_contains() {
        let mut set = HeapRegionSet::new(RegionSetKind::Old, 8);
        assert!(set.is_empty());
        set.add(3).unwrap();
        set.add(7).unwrap();
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert_eq!(set.len(), 2);
        set.remove(3).unwrap();
        assert!(!set.contains(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn double_add_is_rejected() {
        let mut set = HeapRegionSet::new(RegionSetKind::Humongous, 8);
        set.add(1).unwrap();
        assert_eq!(
            set.add(1),
            Err(RegionError::AlreadyMember {
                set: RegionSetKind::Humongous,
                index: 1
            })
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_absent_is_rejected() {
        let mut set = HeapRegionSet::new(RegionSetKind::Archive, 8);
        assert_eq!(
            set.remove(5),
            Err(RegionError::NotMember {
                set: RegionSetKind::Archive,
                index: 5
            })
        );
        // Beyond the bitmap is simply absent.
        assert!(!set.contains(1000));
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut set = HeapRegionSet::new(RegionSetKind::Old, 1);
        set.add(200).unwrap();
        assert!(set.contains(200));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![200]);
    }

    #[test]
    fn iterates_in_index_order() {
        let mut set = HeapRegionSet::new(RegionSetKind::Old, 256);
        for i in [130, 2, 64, 63] {
            set.add(i).unwrap();
        }
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 63, 64, 130]);
    }

    #[test]
    fn set_for_type() {
        assert_eq!(RegionSetKind::for_type(RegionType::OLD), Some(RegionSetKind::Old));
        assert_eq!(RegionSetKind::for_type(RegionType::ARCHIVE), Some(RegionSetKind::Archive));
        assert_eq!(
            RegionSetKind::for_type(RegionType::CONTINUES_HUMONGOUS.with_pinned()),
            Some(RegionSetKind::Humongous)
        );
        assert_eq!(RegionSetKind::for_type(RegionType::EDEN), None);
        assert_eq!(RegionSetKind::for_type(RegionType::FREE), None);
        assert_eq!(RegionSetKind::Humongous.to_string(), "humongous");
    }
}

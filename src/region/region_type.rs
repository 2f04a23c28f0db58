use std::fmt;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The primary state of a region. Exactly one state holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
pub enum RegionState {
    /// On the free list. Not part of any generation.
    Free,
    /// Young region that receives new allocations.
    Eden,
    /// Young region that holds objects which survived at least one young collection.
    Survivor,
    /// The first region of a humongous object.
    StartsHumongous,
    /// A trailing region of a humongous object.
    ContinuesHumongous,
    /// Old generation region.
    Old,
}

impl RegionState {
    /// Short annotation used when printing regions.
    pub const fn annotation(&self) -> &'static str {
        match self {
            RegionState::Free => "F",
            RegionState::Eden => "E",
            RegionState::Survivor => "S",
            RegionState::StartsHumongous => "HS",
            RegionState::ContinuesHumongous => "HC",
            RegionState::Old => "O",
        }
    }

    pub const fn is_young(&self) -> bool {
        matches!(self, RegionState::Eden | RegionState::Survivor)
    }

    pub const fn is_humongous(&self) -> bool {
        matches!(
            self,
            RegionState::StartsHumongous | RegionState::ContinuesHumongous
        )
    }

    /// Can `Pinned` or `Archive` be set on top of this state?
    pub const fn accepts_flags(&self) -> bool {
        matches!(self, RegionState::Old) || self.is_humongous()
    }
}

/// The classification of a region: a primary [`RegionState`] plus the independent
/// `Pinned` and `Archive` flags. `Young` and `Humongous` are derived from the state,
/// so there are no stored booleans that can drift from it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionType {
    state: RegionState,
    flags: u8,
}

impl RegionType {
    const PINNED_FLAG: u8 = 1 << 0;
    const ARCHIVE_FLAG: u8 = 1 << 1;

    pub const FREE: RegionType = RegionType::new(RegionState::Free);
    pub const EDEN: RegionType = RegionType::new(RegionState::Eden);
    pub const SURVIVOR: RegionType = RegionType::new(RegionState::Survivor);
    pub const STARTS_HUMONGOUS: RegionType = RegionType::new(RegionState::StartsHumongous);
    pub const CONTINUES_HUMONGOUS: RegionType = RegionType::new(RegionState::ContinuesHumongous);
    pub const OLD: RegionType = RegionType::new(RegionState::Old);
    /// An old region with fixed (archived) content. Archive regions are always pinned.
    pub const ARCHIVE: RegionType = RegionType::OLD.with_archive();

    pub const fn new(state: RegionState) -> Self {
        RegionType { state, flags: 0 }
    }

    /// The same state with the `Pinned` flag set.
    pub const fn with_pinned(self) -> Self {
        RegionType {
            state: self.state,
            flags: self.flags | Self::PINNED_FLAG,
        }
    }

    /// The same state with the `Archive` flag set.
    pub const fn with_archive(self) -> Self {
        RegionType {
            state: self.state,
            flags: self.flags | Self::ARCHIVE_FLAG,
        }
    }

    /// The same state with no flags.
    pub const fn without_flags(self) -> Self {
        RegionType::new(self.state)
    }

    pub const fn state(&self) -> RegionState {
        self.state
    }

    pub const fn has_flags(&self) -> bool {
        self.flags != 0
    }

    /// Flags are only meaningful on old and humongous states.
    pub const fn is_well_formed(&self) -> bool {
        !self.has_flags() || self.state.accepts_flags()
    }

    pub const fn is_free(&self) -> bool {
        matches!(self.state, RegionState::Free)
    }

    pub const fn is_eden(&self) -> bool {
        matches!(self.state, RegionState::Eden)
    }

    pub const fn is_survivor(&self) -> bool {
        matches!(self.state, RegionState::Survivor)
    }

    pub const fn is_young(&self) -> bool {
        self.state.is_young()
    }

    pub const fn is_humongous(&self) -> bool {
        self.state.is_humongous()
    }

    pub const fn is_starts_humongous(&self) -> bool {
        matches!(self.state, RegionState::StartsHumongous)
    }

    pub const fn is_continues_humongous(&self) -> bool {
        matches!(self.state, RegionState::ContinuesHumongous)
    }

    pub const fn is_old(&self) -> bool {
        matches!(self.state, RegionState::Old)
    }

    pub const fn is_old_or_humongous(&self) -> bool {
        self.is_old() || self.is_humongous()
    }

    pub const fn is_archive(&self) -> bool {
        self.flags & Self::ARCHIVE_FLAG != 0
    }

    /// Pinned regions are never moved. Archive regions are implicitly pinned.
    pub const fn is_pinned(&self) -> bool {
        self.flags & (Self::PINNED_FLAG | Self::ARCHIVE_FLAG) != 0
    }

    /// Short annotation used when printing regions, e.g. `O`, `HS`, `OA` or `HCP`.
    pub fn annotation(&self) -> String {
        let mut s = String::from(self.state.annotation());
        if self.is_archive() {
            s.push('A');
        } else if self.is_pinned() {
            s.push('P');
        }
        s
    }
}

impl Default for RegionType {
    fn default() -> Self {
        RegionType::FREE
    }
}

impl From<RegionState> for RegionType {
    fn from(state: RegionState) -> Self {
        RegionType::new(state)
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = self.state.into();
        write!(f, "{}", name)?;
        if self.is_archive() {
            write!(f, "+Archive")?;
        }
        if self.flags & Self::PINNED_FLAG != 0 {
            write!(f, "+Pinned")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionType({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn exactly_one_primary_state() {
        for state in RegionState::iter() {
            let t = RegionType::new(state);
            let primaries = [
                t.is_free(),
                t.is_eden(),
                t.is_survivor(),
                t.is_starts_humongous(),
                t.is_continues_humongous(),
                t.is_old(),
            ];
            assert_eq!(primaries.iter().filter(|b| **b).count(), 1, "{}", t);
        }
    }

    #[test]
    fn derived_flags() {
        assert!(RegionType::EDEN.is_young());
        assert!(RegionType::SURVIVOR.is_young());
        assert!(!RegionType::OLD.is_young());
        assert!(RegionType::STARTS_HUMONGOUS.is_humongous());
        assert!(RegionType::CONTINUES_HUMONGOUS.is_humongous());
        assert!(!RegionType::FREE.is_humongous());
        assert!(!RegionType::OLD.is_pinned());
    }

    #[test]
    fn archive_implies_pinned() {
        assert!(RegionType::ARCHIVE.is_archive());
        assert!(RegionType::ARCHIVE.is_pinned());
        assert!(RegionType::ARCHIVE.is_old());
        assert!(RegionType::OLD.with_pinned().is_pinned());
        assert!(!RegionType::OLD.with_pinned().is_archive());
        assert_eq!(RegionType::ARCHIVE.without_flags(), RegionType::OLD);
    }

    #[test]
    fn flags_only_on_old_or_humongous() {
        assert!(RegionType::ARCHIVE.is_well_formed());
        assert!(RegionType::STARTS_HUMONGOUS.with_pinned().is_well_formed());
        assert!(!RegionType::EDEN.with_pinned().is_well_formed());
        assert!(!RegionType::FREE.with_archive().is_well_formed());
    }

    #[test]
    fn annotations() {
        assert_eq!(RegionType::FREE.annotation(), "F");
        assert_eq!(RegionType::STARTS_HUMONGOUS.annotation(), "HS");
        assert_eq!(RegionType::ARCHIVE.annotation(), "OA");
        assert_eq!(RegionType::CONTINUES_HUMONGOUS.with_pinned().annotation(), "HCP");
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(RegionType::OLD.with_pinned().to_string(), "Old+Pinned");
        assert_eq!(RegionType::ARCHIVE.to_string(), "Old+Archive");
        let state: RegionState = "Survivor".parse().unwrap();
        assert_eq!(RegionType::from(state), RegionType::SURVIVOR);
    }
}

//! Host-side selection model.

use smallvec::{smallvec, SmallVec};
use std::ops::Range;

/// One selected region in character offsets.
///
/// `a` is the anchor and `b` the moving cursor, so `a > b` is a backwards selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub a: usize,
    pub b: usize,
}

impl Region {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    pub fn cursor(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn begin(&self) -> usize {
        self.a.min(self.b)
    }

    pub fn end(&self) -> usize {
        self.a.max(self.b)
    }

    pub fn is_empty(&self) -> bool {
        self.a == self.b
    }

    pub fn is_reversed(&self) -> bool {
        self.a > self.b
    }

    /// Inclusive containment, matching how hosts treat a cursor at the end of a range.
    pub fn contains(&self, offset: usize) -> bool {
        self.begin() <= offset && offset <= self.end()
    }

    pub fn cover(&self, other: &Region) -> Region {
        Region::new(self.begin().min(other.begin()), self.end().max(other.end()))
    }

    fn clamped(self, len: usize) -> Self {
        Self::new(self.a.min(len), self.b.min(len))
    }
}

impl From<(usize, usize)> for Region {
    fn from((a, b): (usize, usize)) -> Self {
        Self::new(a, b)
    }
}

/// Ordered, never empty, set of regions. The first region is the primary one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    regions: SmallVec<[Region; 1]>,
}

impl Selection {
    pub fn single(region: Region) -> Self {
        Self {
            regions: smallvec![region],
        }
    }

    pub fn cursor(offset: usize) -> Self {
        Self::single(Region::cursor(offset))
    }

    /// Build from regions in order. Returns `None` for an empty list.
    pub fn from_regions(regions: impl IntoIterator<Item = Region>) -> Option<Self> {
        let regions: SmallVec<[Region; 1]> = regions.into_iter().collect();
        if regions.is_empty() {
            return None;
        }
        Some(Self { regions })
    }

    /// Clamp every offset into `[0, len]`.
    pub fn clamped(&self, len: usize) -> Self {
        Self {
            regions: self.regions.iter().map(|r| r.clamped(len)).collect(),
        }
    }

    pub fn primary(&self) -> Region {
        self.regions[0]
    }

    pub fn first(&self) -> Region {
        self.regions[0]
    }

    pub fn last(&self) -> Region {
        self.regions[self.regions.len() - 1]
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Smallest span containing every region.
    pub fn covering_range(&self) -> Range<usize> {
        let cover = self
            .regions
            .iter()
            .skip(1)
            .fold(self.regions[0], |acc, r| acc.cover(r));
        cover.begin()..cover.end()
    }
}

impl From<Region> for Selection {
    fn from(region: Region) -> Self {
        Self::single(region)
    }
}

/// How the user is extending a selection with the mouse, set by the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragKind {
    #[default]
    None,
    Lines,
    Columns,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_direction() {
        let region = Region::new(7, 3);
        assert!(region.is_reversed());
        assert_eq!(region.begin(), 3);
        assert_eq!(region.end(), 7);
        assert!(region.contains(7));
        assert!(!region.contains(8));
    }

    #[test]
    fn covering_range_spans_all_regions() {
        let selection =
            Selection::from_regions([Region::new(10, 12), Region::new(4, 2), Region::new(20, 18)])
                .unwrap();
        assert_eq!(selection.covering_range(), 2..20);
        assert_eq!(selection.primary(), Region::new(10, 12));
        assert_eq!(selection.last(), Region::new(20, 18));
    }

    #[test]
    fn empty_region_list_is_rejected() {
        assert!(Selection::from_regions(Vec::new()).is_none());
    }

    #[test]
    fn clamping_keeps_order() {
        let selection = Selection::from_regions([Region::new(2, 50), Region::new(60, 1)]).unwrap();
        let clamped = selection.clamped(10);
        assert_eq!(clamped.regions(), &[Region::new(2, 10), Region::new(10, 1)]);
    }
}

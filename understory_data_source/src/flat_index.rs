// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat-index translation over cumulative section lengths.

use alloc::vec::Vec;

/// A structured `(section, row)` position within a snapshot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowPosition {
    /// Zero-based section index.
    pub section: usize,
    /// Zero-based row index within the section.
    pub row: usize,
}

impl RowPosition {
    /// Creates a new position.
    #[must_use]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

/// Prefix sums of per-section row counts.
///
/// `starts[i]` is the flat index of the first row of section `i`; the final
/// entry is the total row count. Empty sections share their start with the
/// following section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SectionOffsets {
    starts: Vec<usize>,
}

impl SectionOffsets {
    pub(crate) fn from_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
        let lengths = lengths.into_iter();
        let mut starts = Vec::with_capacity(lengths.size_hint().0 + 1);
        let mut total = 0_usize;
        starts.push(0);
        for len in lengths {
            total += len;
            starts.push(total);
        }
        Self { starts }
    }

    pub(crate) fn total(&self) -> usize {
        self.starts.last().copied().unwrap_or(0)
    }

    pub(crate) fn section_count(&self) -> usize {
        self.starts.len().saturating_sub(1)
    }

    pub(crate) fn section_len(&self, section: usize) -> Option<usize> {
        let start = *self.starts.get(section)?;
        let end = *self.starts.get(section + 1)?;
        Some(end - start)
    }

    pub(crate) fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.starts.windows(2).map(|w| w[1] - w[0])
    }

    /// Flat index of the first row of `section`.
    pub(crate) fn section_start(&self, section: usize) -> Option<usize> {
        if section < self.section_count() {
            Some(self.starts[section])
        } else {
            None
        }
    }

    pub(crate) fn flat_index(&self, position: RowPosition) -> Option<usize> {
        let len = self.section_len(position.section)?;
        (position.row < len).then(|| self.starts[position.section] + position.row)
    }

    pub(crate) fn position(&self, flat: usize) -> Option<RowPosition> {
        if flat >= self.total() {
            return None;
        }
        // Last section whose start is <= flat. Empty sections before it share
        // the same start, so they are skipped.
        let section = self.starts.partition_point(|&start| start <= flat) - 1;
        Some(RowPosition {
            section,
            row: flat - self.starts[section],
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::vec;

    #[test]
    fn empty_has_no_positions() {
        let offsets = SectionOffsets::from_lengths([]);
        assert_eq!(offsets.total(), 0);
        assert_eq!(offsets.section_count(), 0);
        assert_eq!(offsets.position(0), None);
        assert_eq!(offsets.section_start(0), None);
    }

    #[test]
    fn empty_sections_are_skipped() {
        let offsets = SectionOffsets::from_lengths([0, 2, 0, 0, 1, 0]);
        assert_eq!(offsets.total(), 3);
        assert_eq!(offsets.position(0), Some(RowPosition::new(1, 0)));
        assert_eq!(offsets.position(1), Some(RowPosition::new(1, 1)));
        assert_eq!(offsets.position(2), Some(RowPosition::new(4, 0)));
        assert_eq!(offsets.position(3), None);
        assert_eq!(offsets.lengths().collect::<Vec<_>>(), vec![0, 2, 0, 0, 1, 0]);
    }

    #[test]
    fn round_trips_every_offset() {
        let lengths = [3, 0, 5, 1, 0, 4];
        let offsets = SectionOffsets::from_lengths(lengths);
        for flat in 0..offsets.total() {
            let pos = offsets.position(flat).unwrap();
            let preceding: usize = lengths[..pos.section].iter().sum();
            assert_eq!(preceding + pos.row, flat);
            assert_eq!(offsets.flat_index(pos), Some(flat));
        }
    }

    #[test]
    fn flat_index_rejects_out_of_range_rows() {
        let offsets = SectionOffsets::from_lengths([2, 1]);
        assert_eq!(offsets.flat_index(RowPosition::new(0, 2)), None);
        assert_eq!(offsets.flat_index(RowPosition::new(2, 0)), None);
        assert_eq!(offsets.flat_index(RowPosition::new(1, 0)), Some(2));
        assert_eq!(offsets.section_len(1), Some(1));
        assert_eq!(offsets.section_len(2), None);
    }
}

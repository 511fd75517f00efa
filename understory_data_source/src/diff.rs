// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity indexing and the dirty-bit diff.
//!
//! Every snapshot owns an [`IdentityIndex`] built once at construction. It
//! serves two purposes: identity addressing on that snapshot, and O(1)
//! membership tests when the snapshot is later used as a predecessor. The
//! diff pass therefore costs `O(S + R)` over the new snapshot's sections and
//! rows, plus whatever the extractors and comparators cost.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::blob::Identity;
use crate::config::Callbacks;
use crate::diagnostics::Diagnostic;

/// Hash index from identities to positions.
///
/// When an identity repeats, the later position wins.
#[derive(Clone, Debug)]
pub(crate) struct IdentityIndex<S, R> {
    sections: HashMap<S, usize>,
    rows: Vec<HashMap<R, usize>>,
}

impl<S: Identity, R: Identity> IdentityIndex<S, R> {
    /// Indexes `section_ids` and `row_ids`, reporting every duplicate.
    ///
    /// `row_ids` must have one entry per section.
    pub(crate) fn build<F>(section_ids: &[S], row_ids: &[Vec<R>], mut report: F) -> Self
    where
        F: FnMut(Diagnostic<'_, S, R>),
    {
        debug_assert_eq!(
            section_ids.len(),
            row_ids.len(),
            "identity shapes are checked before indexing"
        );
        let mut sections = HashMap::with_capacity(section_ids.len());
        let mut rows = Vec::with_capacity(row_ids.len());
        for (index, (section, section_rows)) in section_ids.iter().zip(row_ids).enumerate() {
            if let Some(first) = sections.insert(section.clone(), index) {
                report(Diagnostic::DuplicateSectionId {
                    id: section,
                    first,
                    duplicate: index,
                });
            }
            let mut by_id = HashMap::with_capacity(section_rows.len());
            for (row_index, row) in section_rows.iter().enumerate() {
                if let Some(first) = by_id.insert(row.clone(), row_index) {
                    report(Diagnostic::DuplicateRowId {
                        section,
                        id: row,
                        first,
                        duplicate: row_index,
                    });
                }
            }
            rows.push(by_id);
        }
        Self { sections, rows }
    }

    pub(crate) fn section(&self, id: &S) -> Option<usize> {
        self.sections.get(id).copied()
    }

    pub(crate) fn row(&self, section: usize, id: &R) -> Option<usize> {
        self.rows.get(section)?.get(id).copied()
    }
}

/// The parts of a predecessor snapshot a diff pass reads.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Prior<'a, B, S, R> {
    pub(crate) blob: &'a B,
    pub(crate) index: &'a IdentityIndex<S, R>,
}

/// Dirty bitmaps for one snapshot.
///
/// `rows` is laid out in flat-index order; `sections` has one bit per section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DirtyBits {
    pub(crate) rows: Vec<bool>,
    pub(crate) sections: Vec<bool>,
}

impl DirtyBits {
    fn all_dirty(sections: usize, rows: usize, headers: bool) -> Self {
        Self {
            rows: vec![true; rows],
            sections: vec![headers; sections],
        }
    }
}

/// Computes dirty bits for the identities of a new snapshot.
///
/// Without a predecessor every row and header is dirty. Otherwise:
///
/// - A section missing from the predecessor is dirty, and so are all of its rows.
///   The header comparator is not called for it.
/// - A section present on both sides is dirty iff the header comparator says
///   so. Without a header extractor or comparator it is clean.
/// - A row is dirty if its identity is missing from the predecessor's section,
///   or if the row comparator says so. The comparator only ever sees rows that
///   exist on both sides.
///
/// Headers are never dirty when no header extractor is configured, since
/// there is no header data to re-render.
///
/// No shortcut is taken for identical blobs or identity lists.
pub(crate) fn compute_dirty<B, S, R, T, H>(
    callbacks: &Callbacks<B, S, R, T, H>,
    prior: Option<Prior<'_, B, S, R>>,
    blob: &B,
    section_ids: &[S],
    row_ids: &[Vec<R>],
    row_count: usize,
) -> DirtyBits
where
    S: Identity,
    R: Identity,
{
    let headers = callbacks.section_header_extractor.is_some();
    let Some(prior) = prior else {
        return DirtyBits::all_dirty(section_ids.len(), row_count, headers);
    };

    let mut bits = DirtyBits {
        rows: Vec::with_capacity(row_count),
        sections: Vec::with_capacity(section_ids.len()),
    };

    for (section, section_rows) in section_ids.iter().zip(row_ids) {
        let Some(prior_section) = prior.index.section(section) else {
            bits.sections.push(headers);
            bits.rows.extend(core::iter::repeat_n(true, section_rows.len()));
            continue;
        };

        let header_dirty = match (
            &callbacks.section_header_extractor,
            &callbacks.section_header_has_changed,
        ) {
            (Some(extract), Some(has_changed)) => {
                has_changed(&extract(prior.blob, section), &extract(blob, section))
            }
            _ => false,
        };
        bits.sections.push(header_dirty);

        for row in section_rows {
            let dirty = prior.index.row(prior_section, row).is_none()
                || (callbacks.row_has_changed)(
                    &(callbacks.row_extractor)(prior.blob, section, row),
                    &(callbacks.row_extractor)(blob, section, row),
                );
            bits.rows.push(dirty);
        }
    }

    bits
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{DataSource, DataSourceBuilder};
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::vec::Vec;

    type Blob = Vec<Vec<u32>>;

    fn index(sections: &[usize], rows: &[Vec<usize>]) -> IdentityIndex<usize, usize> {
        IdentityIndex::build(sections, rows, |_| {})
    }

    #[test]
    fn index_reports_duplicates_and_keeps_the_later_slot() {
        let mut seen = Vec::new();
        let idx = IdentityIndex::build(
            &["a", "b", "a"],
            &[vec!["x", "x"], vec![], vec!["y"]],
            |d| seen.push(d.kind()),
        );
        assert_eq!(seen.len(), 2);
        assert_eq!(idx.section(&"a"), Some(2));
        assert_eq!(idx.row(0, &"x"), Some(1));
        assert_eq!(idx.row(2, &"y"), Some(0));
        assert_eq!(idx.row(5, &"y"), None);
    }

    #[test]
    fn without_prior_everything_is_dirty() {
        let source = DataSourceBuilder::<Blob, _, _, _, _>::for_blob()
            .row_has_changed(|_, _| false)
            .build()
            .unwrap();
        let blob: Blob = vec![vec![1, 2], vec![3]];
        let bits = compute_dirty(
            &source.callbacks,
            None,
            &blob,
            &[0, 1],
            &[vec![0, 1], vec![0]],
            3,
        );
        assert_eq!(bits.rows, [true, true, true]);
        assert_eq!(bits.sections, [true, true]);
    }

    #[test]
    fn headers_stay_clean_without_a_header_extractor() {
        let source = DataSource::<Blob, usize, usize, u32, ()>::builder()
            .row_extractor(|blob, s, r| blob[*s][*r])
            .row_has_changed(|a, b| a != b)
            .section_header_has_changed(|_, _| true)
            .build()
            .unwrap();
        let old: Blob = vec![vec![1]];
        let new: Blob = vec![vec![1], vec![]];

        let first = compute_dirty(&source.callbacks, None, &old, &[0], &[vec![0]], 1);
        assert_eq!(first.rows, [true]);
        assert_eq!(first.sections, [false]);

        let old_index = index(&[0], &[vec![0]]);
        let second = compute_dirty(
            &source.callbacks,
            Some(Prior {
                blob: &old,
                index: &old_index,
            }),
            &new,
            &[0, 1],
            &[vec![0], vec![]],
            1,
        );
        assert_eq!(second.rows, [false]);
        assert_eq!(second.sections, [false, false]);
    }

    #[test]
    fn comparator_only_sees_rows_present_on_both_sides() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = DataSourceBuilder::<Blob, _, _, _, _>::for_blob()
            .row_has_changed(move |a, b| {
                counter.fetch_add(1, Ordering::Relaxed);
                a != b
            })
            .section_header_has_changed(|_, _| false)
            .build()
            .unwrap();

        let old: Blob = vec![vec![1, 2]];
        let new: Blob = vec![vec![1, 5, 9], vec![4]];
        let old_index = index(&[0], &[vec![0, 1]]);
        let bits = compute_dirty(
            &source.callbacks,
            Some(Prior {
                blob: &old,
                index: &old_index,
            }),
            &new,
            &[0, 1],
            &[vec![0, 1, 2], vec![0]],
            4,
        );

        assert_eq!(bits.rows, [false, true, true, true]);
        assert_eq!(bits.sections, [false, true]);
        // Rows 0 and 1 of section 0 only.
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable snapshots and their construction paths.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::blob::{Identity, RowCollection, SectionedBlob, SingleSection};
use crate::config::DataSource;
use crate::diagnostics::Diagnostic;
use crate::diff::{DirtyBits, IdentityIndex, Prior, compute_dirty};
use crate::error::DataSourceError;
use crate::flat_index::{RowPosition, SectionOffsets};

/// An immutable, diffed view of a blob.
///
/// A snapshot holds the blob (by reference count, never copied), the ordered
/// section and row identities, and one dirty bit per row and per section
/// header. Dirty bits describe what changed relative to the predecessor the
/// snapshot was cloned from; a snapshot with no predecessor is entirely dirty,
/// except for headers when no header extractor is configured.
///
/// Snapshots are never mutated. Deriving a new one only reads `self`, so a
/// render pass may keep using an old snapshot while a new one is built.
///
/// # Example
///
/// ```rust
/// use understory_data_source::{DataSourceBuilder, RowPosition};
///
/// let source = DataSourceBuilder::<Vec<Vec<&str>>, _, _, _, _>::for_blob()
///     .row_has_changed(|a, b| a != b)
///     .section_header_has_changed(|a, b| a != b)
///     .build()
///     .unwrap();
///
/// let first = source
///     .snapshot_with_rows_and_sections(vec![vec!["a", "b"], vec!["c"]], None, None)
///     .unwrap();
/// assert_eq!(first.row_count(), 3);
/// assert!(first.row_should_update(1, 0));
///
/// let second = first
///     .clone_with_rows_and_sections(vec![vec!["a", "B"], vec!["c"]], None, None)
///     .unwrap();
/// assert!(!second.row_should_update(0, 0));
/// assert!(second.row_should_update(0, 1));
/// assert_eq!(second.position_for_flat_index(2), Some(RowPosition::new(1, 0)));
/// ```
pub struct Snapshot<B, S, R, T, H> {
    source: DataSource<B, S, R, T, H>,
    blob: Arc<B>,
    section_ids: Vec<S>,
    row_ids: Vec<Vec<R>>,
    offsets: SectionOffsets,
    dirty: DirtyBits,
    index: IdentityIndex<S, R>,
}

impl<B, S: Clone, R: Clone, T, H> Clone for Snapshot<B, S, R, T, H> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            blob: Arc::clone(&self.blob),
            section_ids: self.section_ids.clone(),
            row_ids: self.row_ids.clone(),
            offsets: self.offsets.clone(),
            dirty: self.dirty.clone(),
            index: self.index.clone(),
        }
    }
}

impl<B, S: fmt::Debug, R: fmt::Debug, T, H> fmt::Debug for Snapshot<B, S, R, T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("section_ids", &self.section_ids)
            .field("row_ids", &self.row_ids)
            .field("dirty_rows", &self.dirty.rows)
            .field("dirty_sections", &self.dirty.sections)
            .finish_non_exhaustive()
    }
}

fn check_shape<S, R>(section_ids: &[S], row_ids: &[Vec<R>]) -> Result<(), DataSourceError> {
    if section_ids.len() == row_ids.len() {
        Ok(())
    } else {
        Err(DataSourceError::IdentityShapeMismatch {
            sections: section_ids.len(),
            row_lists: row_ids.len(),
        })
    }
}

/// Fills in whichever identity lists the caller left out from the blob's own order.
fn derive_identities<B: SectionedBlob>(
    blob: &B,
    section_ids: Option<Vec<B::SectionId>>,
    row_ids: Option<Vec<Vec<B::RowId>>>,
) -> (Vec<B::SectionId>, Vec<Vec<B::RowId>>) {
    let section_ids = section_ids.unwrap_or_else(|| blob.section_ids());
    let row_ids = row_ids.unwrap_or_else(|| {
        section_ids
            .iter()
            .map(|section| blob.row_ids(section))
            .collect()
    });
    (section_ids, row_ids)
}

impl<B, S: Identity, R: Identity, T, H> DataSource<B, S, R, T, H> {
    fn require_section_header_comparator(&self) -> Result<(), DataSourceError> {
        if self.has_section_header_comparator() {
            Ok(())
        } else {
            Err(DataSourceError::MissingSectionHeaderComparator)
        }
    }

    /// Builds a snapshot with no predecessor from explicit identities.
    ///
    /// This is the construction path for opaque blobs. Every row and section
    /// of the result is dirty.
    ///
    /// # Errors
    ///
    /// - [`DataSourceError::MissingSectionHeaderComparator`] if no header comparator is configured.
    /// - [`DataSourceError::IdentityShapeMismatch`] if `row_ids` does not have one list per section.
    pub fn snapshot_with_identities(
        &self,
        blob: impl Into<Arc<B>>,
        section_ids: Vec<S>,
        row_ids: Vec<Vec<R>>,
    ) -> Result<Snapshot<B, S, R, T, H>, DataSourceError> {
        self.require_section_header_comparator()?;
        check_shape(&section_ids, &row_ids)?;
        Ok(Snapshot::assemble(
            self.clone(),
            None,
            blob.into(),
            section_ids,
            row_ids,
        ))
    }
}

impl<B, T, H> DataSource<B, B::SectionId, B::RowId, T, H>
where
    B: SectionedBlob,
{
    /// Builds a snapshot with no predecessor, deriving omitted identities from the blob.
    ///
    /// # Errors
    ///
    /// See [`snapshot_with_identities`](Self::snapshot_with_identities).
    pub fn snapshot_with_rows_and_sections(
        &self,
        blob: impl Into<Arc<B>>,
        section_ids: Option<Vec<B::SectionId>>,
        row_ids: Option<Vec<Vec<B::RowId>>>,
    ) -> Result<Snapshot<B, B::SectionId, B::RowId, T, H>, DataSourceError> {
        let blob = blob.into();
        let (section_ids, row_ids) = derive_identities(&*blob, section_ids, row_ids);
        self.snapshot_with_identities(blob, section_ids, row_ids)
    }
}

impl<C, T, H> DataSource<SingleSection<C>, (), C::RowId, T, H>
where
    C: RowCollection,
{
    /// Builds a single-section snapshot with no predecessor.
    ///
    /// `rows` is wrapped in [`SingleSection`]; omitted row identities come from
    /// the collection's own order. This path never fails: without a header
    /// comparator, the implicit section's header is treated as never changing.
    pub fn snapshot_with_rows(
        &self,
        rows: C,
        row_ids: Option<Vec<C::RowId>>,
    ) -> Snapshot<SingleSection<C>, (), C::RowId, T, H> {
        let row_ids = row_ids.unwrap_or_else(|| rows.ids());
        Snapshot::assemble(
            self.clone(),
            None,
            Arc::new(SingleSection(rows)),
            alloc::vec![()],
            alloc::vec![row_ids],
        )
    }
}

impl<B, S: Identity, R: Identity, T, H> Snapshot<B, S, R, T, H> {
    fn assemble(
        source: DataSource<B, S, R, T, H>,
        prior: Option<&Self>,
        blob: Arc<B>,
        section_ids: Vec<S>,
        row_ids: Vec<Vec<R>>,
    ) -> Self {
        let index = IdentityIndex::build(&section_ids, &row_ids, |d| source.report(d));
        let offsets = SectionOffsets::from_lengths(row_ids.iter().map(Vec::len));
        let dirty = compute_dirty(
            &source.callbacks,
            prior.map(|p| Prior {
                blob: &*p.blob,
                index: &p.index,
            }),
            &*blob,
            &section_ids,
            &row_ids,
            offsets.total(),
        );
        tracing::debug!(
            target: "understory_data_source",
            sections = section_ids.len(),
            rows = offsets.total(),
            dirty_sections = dirty.sections.iter().filter(|&&d| d).count(),
            dirty_rows = dirty.rows.iter().filter(|&&d| d).count(),
            has_prior = prior.is_some(),
            "built snapshot"
        );
        Self {
            source,
            blob,
            section_ids,
            row_ids,
            offsets,
            dirty,
            index,
        }
    }

    // -------------------------------------------------------------------------
    // Derivation
    // -------------------------------------------------------------------------

    /// Derives a snapshot for `blob` with explicit identities, diffed against `self`.
    ///
    /// # Errors
    ///
    /// - [`DataSourceError::MissingSectionHeaderComparator`] if no header comparator is configured.
    /// - [`DataSourceError::IdentityShapeMismatch`] if `row_ids` does not have one list per section.
    pub fn clone_with_identities(
        &self,
        blob: impl Into<Arc<B>>,
        section_ids: Vec<S>,
        row_ids: Vec<Vec<R>>,
    ) -> Result<Self, DataSourceError> {
        self.source.require_section_header_comparator()?;
        check_shape(&section_ids, &row_ids)?;
        Ok(Self::assemble(
            self.source.clone(),
            Some(self),
            blob.into(),
            section_ids,
            row_ids,
        ))
    }

    // -------------------------------------------------------------------------
    // Counts and identities
    // -------------------------------------------------------------------------

    /// Returns the data source this snapshot was built with.
    #[must_use]
    pub fn data_source(&self) -> &DataSource<B, S, R, T, H> {
        &self.source
    }

    /// Returns the blob this snapshot reads from.
    #[must_use]
    pub fn blob(&self) -> &B {
        &self.blob
    }

    /// Returns the total number of rows across all sections.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.offsets.total()
    }

    /// Returns the number of sections.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.section_ids.len()
    }

    /// Returns the number of rows plus one header slot per section.
    #[must_use]
    pub fn row_and_section_count(&self) -> usize {
        self.row_count() + self.section_count()
    }

    /// Returns the row count of each section, in section order.
    #[must_use]
    pub fn section_lengths(&self) -> Vec<usize> {
        self.offsets.lengths().collect()
    }

    /// Returns the section identities in render order.
    #[must_use]
    pub fn section_ids(&self) -> &[S] {
        &self.section_ids
    }

    /// Returns the row identities of every section, in render order.
    #[must_use]
    pub fn row_ids_per_section(&self) -> &[Vec<R>] {
        &self.row_ids
    }

    /// Returns the row identities of one section.
    #[must_use]
    pub fn row_ids(&self, section_index: usize) -> Option<&[R]> {
        self.row_ids.get(section_index).map(Vec::as_slice)
    }

    /// Returns the identity of the section at `section_index`.
    #[must_use]
    pub fn section_id(&self, section_index: usize) -> Option<&S> {
        self.section_ids.get(section_index)
    }

    /// Returns the identity of the row at `(section_index, row_index)`.
    #[must_use]
    pub fn row_id(&self, section_index: usize, row_index: usize) -> Option<&R> {
        self.row_ids.get(section_index)?.get(row_index)
    }

    /// Returns the index of `section`. A repeated identity resolves to its last occurrence.
    #[must_use]
    pub fn section_index_of(&self, section: &S) -> Option<usize> {
        self.index.section(section)
    }

    /// Returns the position of `row` within `section`.
    ///
    /// Repeated identities resolve to their last occurrence.
    #[must_use]
    pub fn position_of(&self, section: &S, row: &R) -> Option<RowPosition> {
        let section_index = self.index.section(section)?;
        let row_index = self.index.row(section_index, row)?;
        Some(RowPosition::new(section_index, row_index))
    }

    // -------------------------------------------------------------------------
    // Data
    // -------------------------------------------------------------------------

    /// Extracts the data for the row at `(section_index, row_index)`.
    ///
    /// Returns `None` and reports [`Diagnostic::RowOutOfBounds`] if the
    /// position is not part of this snapshot. The row extractor is not called
    /// in that case, since there is no row identity to hand it.
    #[must_use]
    pub fn row_data(&self, section_index: usize, row_index: usize) -> Option<T> {
        let Some(row) = self.row_id(section_index, row_index) else {
            self.source.report(Diagnostic::RowOutOfBounds {
                section_index,
                row_index,
            });
            return None;
        };
        let section = &self.section_ids[section_index];
        Some((self.source.callbacks.row_extractor)(self.blob(), section, row))
    }

    /// Extracts the header data for the section at `section_index`.
    ///
    /// Returns `None` if no header extractor is configured. Out-of-range indices
    /// also return `None` and report [`Diagnostic::SectionOutOfBounds`].
    #[must_use]
    pub fn section_header_data(&self, section_index: usize) -> Option<H> {
        let Some(section) = self.section_ids.get(section_index) else {
            self.source
                .report(Diagnostic::SectionOutOfBounds { section_index });
            return None;
        };
        let extract = self.source.callbacks.section_header_extractor.as_ref()?;
        Some(extract(self.blob(), section))
    }

    // -------------------------------------------------------------------------
    // Dirty bits
    // -------------------------------------------------------------------------

    /// Returns `true` if the row at `(section_index, row_index)` must be re-rendered.
    ///
    /// Out-of-range positions report [`Diagnostic::RowOutOfBounds`] and return `false`.
    #[must_use]
    pub fn row_should_update(&self, section_index: usize, row_index: usize) -> bool {
        match self
            .offsets
            .flat_index(RowPosition::new(section_index, row_index))
        {
            Some(flat) => self.dirty.rows[flat],
            None => {
                self.source.report(Diagnostic::RowOutOfBounds {
                    section_index,
                    row_index,
                });
                false
            }
        }
    }

    /// Returns `true` if the header of the section at `section_index` must be re-rendered.
    ///
    /// Always `false` when no header extractor is configured. Out-of-range
    /// indices report [`Diagnostic::SectionOutOfBounds`] and return `false`.
    #[must_use]
    pub fn section_header_should_update(&self, section_index: usize) -> bool {
        let Some(&dirty) = self.dirty.sections.get(section_index) else {
            self.source
                .report(Diagnostic::SectionOutOfBounds { section_index });
            return false;
        };
        dirty
    }

    /// Returns the dirty bit of `row` in `section`, addressed by identity.
    ///
    /// Repeated identities resolve to their last occurrence. Returns `None` if
    /// either identity is not part of this snapshot.
    #[must_use]
    pub fn row_dirty_by_id(&self, section: &S, row: &R) -> Option<bool> {
        let position = self.position_of(section, row)?;
        let flat = self.offsets.flat_index(position)?;
        Some(self.dirty.rows[flat])
    }

    /// Returns the dirty bits of one section's rows.
    #[must_use]
    pub fn dirty_rows(&self, section_index: usize) -> Option<&[bool]> {
        let start = self.offsets.section_start(section_index)?;
        let len = self.offsets.section_len(section_index)?;
        Some(&self.dirty.rows[start..start + len])
    }

    /// Returns one header dirty bit per section, in section order.
    ///
    /// Agrees with [`section_header_should_update`](Self::section_header_should_update):
    /// every bit is `false` when no header extractor is configured.
    #[must_use]
    pub fn dirty_sections(&self) -> &[bool] {
        &self.dirty.sections
    }

    /// Returns the number of dirty rows.
    #[must_use]
    pub fn dirty_row_count(&self) -> usize {
        self.dirty.rows.iter().filter(|&&d| d).count()
    }

    /// Returns the number of dirty section headers.
    #[must_use]
    pub fn dirty_section_count(&self) -> usize {
        self.dirty.sections.iter().filter(|&&d| d).count()
    }

    /// Returns `true` if no row and no section header is dirty.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.dirty.rows.contains(&true) && !self.dirty.sections.contains(&true)
    }

    /// Returns the positions of all dirty rows, in render order.
    pub fn dirty_positions(&self) -> impl Iterator<Item = RowPosition> + '_ {
        self.dirty
            .rows
            .iter()
            .enumerate()
            .filter(|&(_, &dirty)| dirty)
            .filter_map(|(flat, _)| self.offsets.position(flat))
    }

    // -------------------------------------------------------------------------
    // Flat indices
    // -------------------------------------------------------------------------

    /// Translates a flat row offset into a `(section, row)` position.
    ///
    /// Returns `None` outside `0..row_count()`.
    #[must_use]
    pub fn position_for_flat_index(&self, flat_index: usize) -> Option<RowPosition> {
        self.offsets.position(flat_index)
    }

    /// Translates a `(section, row)` position into a flat row offset.
    #[must_use]
    pub fn flat_index_of(&self, position: RowPosition) -> Option<usize> {
        self.offsets.flat_index(position)
    }

    /// Returns the index of the section owning a flat row offset.
    #[must_use]
    pub fn section_index_for_flat_index(&self, flat_index: usize) -> Option<usize> {
        self.offsets.position(flat_index).map(|p| p.section)
    }

    /// Returns the identity of the row at a flat offset.
    #[must_use]
    pub fn row_id_for_flat_index(&self, flat_index: usize) -> Option<&R> {
        let position = self.offsets.position(flat_index)?;
        self.row_id(position.section, position.row)
    }

    /// Returns the identity of the section owning a flat offset.
    #[must_use]
    pub fn section_id_for_flat_index(&self, flat_index: usize) -> Option<&S> {
        let position = self.offsets.position(flat_index)?;
        self.section_id(position.section)
    }
}

impl<B, T, H> Snapshot<B, B::SectionId, B::RowId, T, H>
where
    B: SectionedBlob,
{
    /// Derives a snapshot for `blob`, diffed against `self`.
    ///
    /// Omitted identities are derived from the blob's own order.
    ///
    /// # Errors
    ///
    /// See [`clone_with_identities`](Self::clone_with_identities).
    pub fn clone_with_rows_and_sections(
        &self,
        blob: impl Into<Arc<B>>,
        section_ids: Option<Vec<B::SectionId>>,
        row_ids: Option<Vec<Vec<B::RowId>>>,
    ) -> Result<Self, DataSourceError> {
        let blob = blob.into();
        let (section_ids, row_ids) = derive_identities(&*blob, section_ids, row_ids);
        self.clone_with_identities(blob, section_ids, row_ids)
    }
}

impl<C, T, H> Snapshot<SingleSection<C>, (), C::RowId, T, H>
where
    C: RowCollection,
{
    /// Derives a single-section snapshot for `rows`, diffed against `self`.
    ///
    /// See [`DataSource::snapshot_with_rows`] for the header defaulting rule.
    #[must_use]
    pub fn clone_with_rows(&self, rows: C, row_ids: Option<Vec<C::RowId>>) -> Self {
        let row_ids = row_ids.unwrap_or_else(|| rows.ids());
        Self::assemble(
            self.source.clone(),
            Some(self),
            Arc::new(SingleSection(rows)),
            alloc::vec![()],
            alloc::vec![row_ids],
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::DataSourceBuilder;
    use alloc::vec;

    type Nested = Vec<Vec<u32>>;
    type NestedSnapshot = Snapshot<Nested, usize, usize, Option<u32>, Option<Vec<u32>>>;

    fn source() -> DataSource<Nested, usize, usize, Option<u32>, Option<Vec<u32>>> {
        DataSourceBuilder::<Nested, _, _, _, _>::for_blob()
            .row_has_changed(|a, b| a != b)
            .section_header_has_changed(|a, b| a != b)
            .build()
            .unwrap()
    }

    fn initial(blob: Nested) -> NestedSnapshot {
        source()
            .snapshot_with_rows_and_sections(blob, None, None)
            .unwrap()
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let err = source()
            .snapshot_with_identities(vec![vec![1]], vec![0, 1], vec![vec![0]])
            .unwrap_err();
        assert_eq!(
            err,
            DataSourceError::IdentityShapeMismatch {
                sections: 2,
                row_lists: 1
            }
        );
    }

    #[test]
    fn multi_section_requires_header_comparator() {
        let source = DataSourceBuilder::<Nested, _, _, _, _>::for_blob()
            .row_has_changed(|a, b| a != b)
            .build()
            .unwrap();
        let err = source
            .snapshot_with_rows_and_sections(vec![vec![1]], None, None)
            .unwrap_err();
        assert_eq!(err, DataSourceError::MissingSectionHeaderComparator);
    }

    #[test]
    fn explicit_section_ids_derive_rows_from_blob() {
        let snap = source()
            .snapshot_with_rows_and_sections(vec![vec![1, 2], vec![3]], Some(vec![1, 0]), None)
            .unwrap();
        assert_eq!(snap.section_ids(), &[1, 0]);
        assert_eq!(snap.row_ids_per_section(), &[vec![0], vec![0, 1]]);
        assert_eq!(snap.row_data(0, 0), Some(Some(3)));
    }

    #[test]
    fn counts_and_lengths() {
        let snap = initial(vec![vec![1, 2, 3], vec![], vec![4]]);
        assert_eq!(snap.row_count(), 4);
        assert_eq!(snap.section_count(), 3);
        assert_eq!(snap.row_and_section_count(), 7);
        assert_eq!(snap.section_lengths(), vec![3, 0, 1]);
        assert_eq!(snap.dirty_rows(1), Some(&[][..]));
        assert_eq!(snap.dirty_rows(3), None);
    }

    #[test]
    fn header_data_and_dirtiness() {
        let first = initial(vec![vec![1], vec![2]]);
        assert_eq!(first.section_header_data(1), Some(Some(vec![2])));
        assert!(first.section_header_should_update(0));

        let second = first
            .clone_with_rows_and_sections(vec![vec![1], vec![5]], None, None)
            .unwrap();
        assert_eq!(second.dirty_sections(), &[false, true]);
        assert!(!second.section_header_should_update(0));
        assert!(second.section_header_should_update(1));
        assert!(!second.section_header_should_update(2));
        assert_eq!(second.section_header_data(2), None);
    }

    #[test]
    fn dirty_positions_follow_render_order() {
        let first = initial(vec![vec![1, 2], vec![3, 4]]);
        let second = first
            .clone_with_rows_and_sections(vec![vec![1, 9], vec![8, 4]], None, None)
            .unwrap();
        let dirty: Vec<_> = second.dirty_positions().collect();
        assert_eq!(dirty, vec![RowPosition::new(0, 1), RowPosition::new(1, 0)]);
        assert_eq!(second.dirty_row_count(), 2);
        assert_eq!(second.dirty_section_count(), 2);
        assert!(!second.is_clean());
    }

    #[test]
    fn derived_snapshot_leaves_predecessor_untouched() {
        let first = initial(vec![vec![1, 2]]);
        let _second = first
            .clone_with_rows_and_sections(vec![vec![1, 2]], None, None)
            .unwrap();
        assert_eq!(first.dirty_row_count(), 2);
        assert_eq!(first.blob(), &vec![vec![1, 2]]);
    }

    #[test]
    fn single_section_defaults_header_to_unchanged() {
        let source = DataSourceBuilder::<SingleSection<Vec<char>>, _, _, _, _>::for_blob()
            .row_has_changed(|a, b| a != b)
            .build()
            .unwrap();
        let first = source.snapshot_with_rows(vec!['a', 'b'], None);
        assert_eq!(first.section_ids(), &[()]);
        assert!(first.section_header_should_update(0));

        let second = first.clone_with_rows(vec!['a', 'c', 'd'], None);
        assert!(!second.section_header_should_update(0));
        assert_eq!(second.dirty_rows(0), Some(&[false, true, true][..]));
        assert_eq!(second.row_data(0, 2), Some(Some('d')));
    }
}

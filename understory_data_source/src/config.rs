// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data source configuration: extractors, comparators, and the diagnostic sink.

use alloc::sync::Arc;
use core::fmt;

use crate::blob::{Identity, SectionedBlob};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::DataSourceError;

/// Maps `(blob, section, row)` to the data needed to render a row.
pub type RowExtractor<B, S, R, T> = Arc<dyn Fn(&B, &S, &R) -> T + Send + Sync>;

/// Maps `(blob, section)` to the data needed to render a section header.
pub type SectionHeaderExtractor<B, S, H> = Arc<dyn Fn(&B, &S) -> H + Send + Sync>;

/// Returns `true` when two values for the same identity need a re-render.
pub type HasChanged<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

type SharedSink<S, R> = Arc<dyn DiagnosticSink<S, R> + Send + Sync>;

pub(crate) struct Callbacks<B, S, R, T, H> {
    pub(crate) row_extractor: RowExtractor<B, S, R, T>,
    pub(crate) section_header_extractor: Option<SectionHeaderExtractor<B, S, H>>,
    pub(crate) row_has_changed: HasChanged<T>,
    pub(crate) section_header_has_changed: Option<HasChanged<H>>,
    pub(crate) diagnostics: SharedSink<S, R>,
}

/// Builder for a [`DataSource`].
///
/// Required and optional fields:
///
/// | Field | Required |
/// |---|---|
/// | [`row_extractor`](Self::row_extractor) | yes, unless pre-filled by [`for_blob`](Self::for_blob) |
/// | [`section_header_extractor`](Self::section_header_extractor) | no |
/// | [`row_has_changed`](Self::row_has_changed) | yes |
/// | [`section_header_has_changed`](Self::section_header_has_changed) | only for multi-section snapshots |
/// | [`diagnostics`](Self::diagnostics) | no, defaults to [`TracingSink`] |
///
/// The first three are checked by [`build`](Self::build). The header comparator
/// is checked when a multi-section snapshot is actually constructed, because the
/// single-section path has a safe default for it.
pub struct DataSourceBuilder<B, S, R, T, H> {
    row_extractor: Option<RowExtractor<B, S, R, T>>,
    section_header_extractor: Option<SectionHeaderExtractor<B, S, H>>,
    row_has_changed: Option<HasChanged<T>>,
    section_header_has_changed: Option<HasChanged<H>>,
    diagnostics: Option<SharedSink<S, R>>,
}

impl<B, S, R, T, H> Default for DataSourceBuilder<B, S, R, T, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, S, R, T, H> fmt::Debug for DataSourceBuilder<B, S, R, T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceBuilder")
            .field("row_extractor", &self.row_extractor.is_some())
            .field(
                "section_header_extractor",
                &self.section_header_extractor.is_some(),
            )
            .field("row_has_changed", &self.row_has_changed.is_some())
            .field(
                "section_header_has_changed",
                &self.section_header_has_changed.is_some(),
            )
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl<B, S, R, T, H> DataSourceBuilder<B, S, R, T, H> {
    /// Creates an empty builder for an opaque blob.
    ///
    /// Both the row extractor and the row comparator must be supplied.
    #[must_use]
    pub fn new() -> Self {
        Self {
            row_extractor: None,
            section_header_extractor: None,
            row_has_changed: None,
            section_header_has_changed: None,
            diagnostics: None,
        }
    }

    /// Sets the row extractor.
    #[must_use]
    pub fn row_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&B, &S, &R) -> T + Send + Sync + 'static,
    {
        self.row_extractor = Some(Arc::new(extractor));
        self
    }

    /// Sets the section header extractor.
    ///
    /// Without one, header data is always `None` and header dirty queries
    /// always report `false`.
    #[must_use]
    pub fn section_header_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&B, &S) -> H + Send + Sync + 'static,
    {
        self.section_header_extractor = Some(Arc::new(extractor));
        self
    }

    /// Sets the row comparator.
    #[must_use]
    pub fn row_has_changed<F>(mut self, has_changed: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.row_has_changed = Some(Arc::new(has_changed));
        self
    }

    /// Sets the section header comparator.
    #[must_use]
    pub fn section_header_has_changed<F>(mut self, has_changed: F) -> Self
    where
        F: Fn(&H, &H) -> bool + Send + Sync + 'static,
    {
        self.section_header_has_changed = Some(Arc::new(has_changed));
        self
    }

    /// Sets the sink that receives non-fatal diagnostics.
    #[must_use]
    pub fn diagnostics<D>(mut self, sink: D) -> Self
    where
        D: DiagnosticSink<S, R> + Send + Sync + 'static,
    {
        self.diagnostics = Some(Arc::new(sink));
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`DataSourceError::MissingRowComparator`] if no row comparator was set.
    /// - [`DataSourceError::MissingRowExtractor`] if no row extractor was set.
    pub fn build(self) -> Result<DataSource<B, S, R, T, H>, DataSourceError>
    where
        S: Identity,
        R: Identity,
    {
        let row_has_changed = self
            .row_has_changed
            .ok_or(DataSourceError::MissingRowComparator)?;
        let row_extractor = self
            .row_extractor
            .ok_or(DataSourceError::MissingRowExtractor)?;
        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| Arc::new(TracingSink) as SharedSink<S, R>);
        Ok(DataSource {
            callbacks: Arc::new(Callbacks {
                row_extractor,
                section_header_extractor: self.section_header_extractor,
                row_has_changed,
                section_header_has_changed: self.section_header_has_changed,
                diagnostics,
            }),
        })
    }
}

impl<B>
    DataSourceBuilder<B, B::SectionId, B::RowId, Option<B::Row>, Option<B::Header>>
where
    B: SectionedBlob + 'static,
    B::Row: Clone,
    B::Header: Clone,
{
    /// Creates a builder pre-filled with nested-lookup extractors for `B`.
    ///
    /// Rows are looked up with [`SectionedBlob::row`] and headers with
    /// [`SectionedBlob::header`]; both are cloned out of the blob. A missing key
    /// yields `None`, which is handed to the comparators like any other value.
    ///
    /// Only the row comparator still needs to be supplied.
    #[must_use]
    pub fn for_blob() -> Self {
        Self::new()
            .row_extractor(|blob: &B, section: &B::SectionId, row: &B::RowId| {
                blob.row(section, row).cloned()
            })
            .section_header_extractor(|blob: &B, section: &B::SectionId| {
                blob.header(section).cloned()
            })
    }
}

/// A validated set of extractors and comparators.
///
/// `DataSource` is cheap to clone and shared by every [`Snapshot`](crate::Snapshot)
/// created from it. It is the entry point for initial snapshots; derived
/// snapshots are produced from an existing snapshot with its `clone_with_*`
/// methods.
///
/// # Type Parameters
///
/// - `B`: the blob type, opaque to the engine.
/// - `S`, `R`: section and row identities.
/// - `T`, `H`: row and section header data, as produced by the extractors.
pub struct DataSource<B, S, R, T, H> {
    pub(crate) callbacks: Arc<Callbacks<B, S, R, T, H>>,
}

impl<B, S, R, T, H> Clone for DataSource<B, S, R, T, H> {
    fn clone(&self) -> Self {
        Self {
            callbacks: Arc::clone(&self.callbacks),
        }
    }
}

impl<B, S, R, T, H> fmt::Debug for DataSource<B, S, R, T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field(
                "section_header_extractor",
                &self.has_section_header_extractor(),
            )
            .field(
                "section_header_has_changed",
                &self.has_section_header_comparator(),
            )
            .finish_non_exhaustive()
    }
}

impl<B, S, R, T, H> DataSource<B, S, R, T, H> {
    /// Returns a builder for an opaque blob type.
    #[must_use]
    pub fn builder() -> DataSourceBuilder<B, S, R, T, H> {
        DataSourceBuilder::new()
    }

    /// Returns `true` if a section header extractor is configured.
    #[must_use]
    pub fn has_section_header_extractor(&self) -> bool {
        self.callbacks.section_header_extractor.is_some()
    }

    /// Returns `true` if a section header comparator is configured.
    #[must_use]
    pub fn has_section_header_comparator(&self) -> bool {
        self.callbacks.section_header_has_changed.is_some()
    }

    /// Returns `true` if both data sources share the same configuration.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callbacks, &other.callbacks)
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic<'_, S, R>) {
        self.callbacks.diagnostics.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::vec::Vec;

    type Nested = Vec<Vec<u32>>;

    #[test]
    fn build_requires_row_comparator() {
        let err = DataSourceBuilder::<Nested, _, _, _, _>::for_blob()
            .build()
            .unwrap_err();
        assert_eq!(err, DataSourceError::MissingRowComparator);
    }

    #[test]
    fn build_requires_row_extractor_for_opaque_blobs() {
        let err = DataSource::<(), u8, u8, u8, ()>::builder()
            .row_has_changed(|a, b| a != b)
            .build()
            .unwrap_err();
        assert_eq!(err, DataSourceError::MissingRowExtractor);
    }

    #[test]
    fn for_blob_fills_in_extractors() {
        let source = DataSourceBuilder::<Nested, _, _, _, _>::for_blob()
            .row_has_changed(|a, b| a != b)
            .build()
            .unwrap();
        assert!(source.has_section_header_extractor());
        assert!(!source.has_section_header_comparator());

        let blob: Nested = alloc::vec![alloc::vec![7, 8]];
        let row = (source.callbacks.row_extractor)(&blob, &0, &1);
        assert_eq!(row, Some(8));
        let missing = (source.callbacks.row_extractor)(&blob, &3, &0);
        assert_eq!(missing, None);
    }

    #[test]
    fn clones_share_configuration() {
        let a = DataSourceBuilder::<Nested, _, _, _, _>::for_blob()
            .row_has_changed(|a, b| a != b)
            .build()
            .unwrap();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
    }
}

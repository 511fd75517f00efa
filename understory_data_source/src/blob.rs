// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blob shape traits used for identity derivation and default extraction.
//!
//! The diff engine itself never looks inside a blob. These traits only matter
//! when the caller asks the crate to derive identities from the blob, or to use
//! the default nested-lookup extractors from [`DataSourceBuilder::for_blob`].
//!
//! [`DataSourceBuilder::for_blob`]: crate::DataSourceBuilder::for_blob

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::{BuildHasher, Hash};

use indexmap::IndexMap;

/// Key type usable as a section or row identity.
///
/// Identities are hashed for O(1) membership tests during a diff and are
/// printed in diagnostics, so they need `Debug` as well as `Eq + Hash`.
pub trait Identity: Clone + Eq + Hash + Debug {}

impl<T> Identity for T where T: Clone + Eq + Hash + Debug {}

/// A blob with an ordered set of sections, each holding an ordered set of rows.
///
/// Implementations define the blob's *own* key order, which is the order used
/// when a snapshot is constructed without explicit identities.
pub trait SectionedBlob {
    /// Section identity type.
    type SectionId: Identity;
    /// Row identity type, unique within a section.
    type RowId: Identity;
    /// Per-row data returned by the default row extractor.
    type Row;
    /// Per-section data returned by the default header extractor.
    type Header;

    /// Returns the section identities in blob order.
    fn section_ids(&self) -> Vec<Self::SectionId>;

    /// Returns the row identities of `section` in blob order.
    ///
    /// Unknown sections yield an empty list.
    fn row_ids(&self, section: &Self::SectionId) -> Vec<Self::RowId>;

    /// Nested lookup of a single row.
    fn row(&self, section: &Self::SectionId, row: &Self::RowId) -> Option<&Self::Row>;

    /// Direct lookup of a section.
    fn header(&self, section: &Self::SectionId) -> Option<&Self::Header>;
}

/// A flat, ordered collection of rows.
///
/// Wrap one in [`SingleSection`] to use it as a one-section [`SectionedBlob`].
pub trait RowCollection {
    /// Row identity type.
    type RowId: Identity;
    /// Row data type.
    type Row;

    /// Returns the row identities in collection order.
    fn ids(&self) -> Vec<Self::RowId>;

    /// Looks up a single row.
    fn get_row(&self, row: &Self::RowId) -> Option<&Self::Row>;
}

/// Presents a [`RowCollection`] as a blob with exactly one implicit section.
///
/// The implicit section's identity is `()`, and its header is the collection
/// itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleSection<C>(pub C);

impl<C> SingleSection<C> {
    /// Returns the wrapped row collection.
    #[must_use]
    pub fn rows(&self) -> &C {
        &self.0
    }

    /// Unwraps the row collection.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.0
    }
}

impl<C: RowCollection> SectionedBlob for SingleSection<C> {
    type SectionId = ();
    type RowId = C::RowId;
    type Row = C::Row;
    type Header = C;

    fn section_ids(&self) -> Vec<()> {
        alloc::vec![()]
    }

    fn row_ids(&self, _section: &()) -> Vec<C::RowId> {
        self.0.ids()
    }

    fn row(&self, _section: &(), row: &C::RowId) -> Option<&C::Row> {
        self.0.get_row(row)
    }

    fn header(&self, _section: &()) -> Option<&C> {
        Some(&self.0)
    }
}

// -----------------------------------------------------------------------------
// Flat collections
// -----------------------------------------------------------------------------

impl<T> RowCollection for Vec<T> {
    type RowId = usize;
    type Row = T;

    fn ids(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    fn get_row(&self, row: &usize) -> Option<&T> {
        self.get(*row)
    }
}

impl<R: Identity + Ord, T> RowCollection for BTreeMap<R, T> {
    type RowId = R;
    type Row = T;

    fn ids(&self) -> Vec<R> {
        self.keys().cloned().collect()
    }

    fn get_row(&self, row: &R) -> Option<&T> {
        self.get(row)
    }
}

impl<R: Identity, T, H: BuildHasher> RowCollection for IndexMap<R, T, H> {
    type RowId = R;
    type Row = T;

    fn ids(&self) -> Vec<R> {
        self.keys().cloned().collect()
    }

    fn get_row(&self, row: &R) -> Option<&T> {
        self.get(row)
    }
}

// -----------------------------------------------------------------------------
// Nested collections
// -----------------------------------------------------------------------------

impl<T> SectionedBlob for Vec<Vec<T>> {
    type SectionId = usize;
    type RowId = usize;
    type Row = T;
    type Header = Vec<T>;

    fn section_ids(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    fn row_ids(&self, section: &usize) -> Vec<usize> {
        self.get(*section)
            .map(RowCollection::ids)
            .unwrap_or_default()
    }

    fn row(&self, section: &usize, row: &usize) -> Option<&T> {
        self.get(*section)?.get(*row)
    }

    fn header(&self, section: &usize) -> Option<&Vec<T>> {
        self.get(*section)
    }
}

impl<S, R, T> SectionedBlob for BTreeMap<S, BTreeMap<R, T>>
where
    S: Identity + Ord,
    R: Identity + Ord,
{
    type SectionId = S;
    type RowId = R;
    type Row = T;
    type Header = BTreeMap<R, T>;

    fn section_ids(&self) -> Vec<S> {
        self.keys().cloned().collect()
    }

    fn row_ids(&self, section: &S) -> Vec<R> {
        self.get(section)
            .map(RowCollection::ids)
            .unwrap_or_default()
    }

    fn row(&self, section: &S, row: &R) -> Option<&T> {
        self.get(section)?.get(row)
    }

    fn header(&self, section: &S) -> Option<&BTreeMap<R, T>> {
        self.get(section)
    }
}

impl<S, R, T, HS, HR> SectionedBlob for IndexMap<S, IndexMap<R, T, HR>, HS>
where
    S: Identity,
    R: Identity,
    HS: BuildHasher,
    HR: BuildHasher,
{
    type SectionId = S;
    type RowId = R;
    type Row = T;
    type Header = IndexMap<R, T, HR>;

    fn section_ids(&self) -> Vec<S> {
        self.keys().cloned().collect()
    }

    fn row_ids(&self, section: &S) -> Vec<R> {
        self.get(section)
            .map(RowCollection::ids)
            .unwrap_or_default()
    }

    fn row(&self, section: &S, row: &R) -> Option<&T> {
        self.get(section)?.get(row)
    }

    fn header(&self, section: &S) -> Option<&IndexMap<R, T, HR>> {
        self.get(section)
    }
}
